// ─── Version File ───
// Parses a version JSON (`versions/<id>/<id>.json`), evaluates OS / feature
// rules and resolves `inheritsFrom` chains written by loader installers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;

/// Parent chains deeper than this are treated as cycles.
const MAX_INHERITANCE_DEPTH: usize = 8;

/// A fully parsed version JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    pub main_class: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    /// Overrides the jar this version launches with (`versions/<jar>/<jar>.jar`).
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    /// Legacy asset id when `assetIndex` is missing.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(default)]
    pub logging: Option<LoggingInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
    #[serde(default)]
    pub component: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
    #[serde(default)]
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingInfo {
    #[serde(default)]
    pub client: Option<ClientLogging>,
}

#[derive(Debug, Deserialize)]
pub struct ClientLogging {
    /// JVM argument template containing `${path}`.
    pub argument: String,
    pub file: LoggingFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingFile {
    pub id: String,
    pub sha1: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

// ─── Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Launcher feature flags referenced by argument rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchFeatures {
    pub is_demo_user: bool,
    pub has_custom_resolution: bool,
}

impl LaunchFeatures {
    fn get(&self, name: &str) -> bool {
        match name {
            "is_demo_user" => self.is_demo_user,
            "has_custom_resolution" => self.has_custom_resolution,
            _ => false,
        }
    }
}

/// Get the Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn os_matches(os: &OsRule) -> bool {
    if let Some(name) = &os.name {
        if name != current_os_name() {
            return false;
        }
    }
    match os.arch.as_deref() {
        Some("x86") => cfg!(target_arch = "x86"),
        _ => true,
    }
}

/// Evaluate a rule list top to bottom; the last applicable rule wins and
/// nothing is allowed until some rule applies. An empty list allows.
pub fn rules_allow(rules: &[Rule], features: &LaunchFeatures) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        let os_ok = rule.os.as_ref().map_or(true, os_matches);
        let features_ok = rule.features.as_ref().map_or(true, |wanted| {
            wanted
                .iter()
                .all(|(name, value)| features.get(name) == *value)
        });

        if os_ok && features_ok {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

impl Argument {
    /// The values this argument contributes under `features`, if any.
    pub fn values(&self, features: &LaunchFeatures) -> Vec<String> {
        match self {
            Argument::Plain(arg) => vec![arg.clone()],
            Argument::Conditional { rules, value } => {
                if !rules_allow(rules, features) {
                    return vec![];
                }
                match value {
                    ArgumentValue::One(v) => vec![v.clone()],
                    ArgumentValue::Many(vs) => vs.clone(),
                }
            }
        }
    }
}

// ─── Library Entry ───

#[derive(Debug, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    /// Maven repository base for libraries without `downloads` (Fabric / Quilt style).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    #[serde(default)]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl LibraryEntry {
    pub fn is_allowed_for_current_os(&self) -> bool {
        match &self.rules {
            Some(rules) => rules_allow(rules, &LaunchFeatures::default()),
            None => true,
        }
    }

    /// Native classifier for the current OS, with `${arch}` substituted.
    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        let classifier = self.natives.as_ref()?.get(current_os_name())?;
        let arch = if cfg!(target_pointer_width = "64") {
            "64"
        } else {
            "32"
        };
        Some(classifier.replace("${arch}", arch))
    }

    /// Where the main artifact lives under `libraries_dir`.
    pub fn library_path(&self, libraries_dir: &Path) -> LauncherResult<PathBuf> {
        if let Some(path) = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.as_deref())
        {
            return Ok(libraries_dir.join(path));
        }
        Ok(MavenArtifact::parse(&self.name)?.library_path(libraries_dir))
    }

    /// Download job for the main artifact, or `None` when there is nothing
    /// remote to fetch (natives-only entries, Forge's locally provided jars).
    pub fn artifact_download(
        &self,
        libraries_dir: &Path,
        default_repo: &str,
    ) -> LauncherResult<Option<DownloadEntry>> {
        if let Some(downloads) = &self.downloads {
            let Some(artifact) = &downloads.artifact else {
                return Ok(None);
            };
            if artifact.url.is_empty() {
                return Ok(None);
            }
            return Ok(Some(DownloadEntry {
                url: artifact.url.clone(),
                dest: self.library_path(libraries_dir)?,
                sha1: artifact.sha1.clone(),
            }));
        }

        let maven = MavenArtifact::parse(&self.name)?;
        let repo = self.url.as_deref().unwrap_or(default_repo);
        Ok(Some(DownloadEntry {
            url: maven.url(repo),
            dest: maven.library_path(libraries_dir),
            sha1: self.sha1.clone(),
        }))
    }

    /// Download job for the native classifier jar of the current OS.
    pub fn native_download(&self, libraries_dir: &Path) -> LauncherResult<Option<DownloadEntry>> {
        let Some(classifier) = self.native_classifier_for_current_os() else {
            return Ok(None);
        };

        let listed = self
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(&classifier));

        if let Some(native) = listed {
            let dest = match &native.path {
                Some(path) => libraries_dir.join(path),
                None => self.native_maven(&classifier)?.library_path(libraries_dir),
            };
            return Ok(Some(DownloadEntry {
                url: native.url.clone(),
                dest,
                sha1: native.sha1.clone(),
            }));
        }

        let Some(repo) = self.url.as_deref() else {
            return Ok(None);
        };
        let maven = self.native_maven(&classifier)?;
        Ok(Some(DownloadEntry {
            url: maven.url(repo),
            dest: maven.library_path(libraries_dir),
            sha1: None,
        }))
    }

    fn native_maven(&self, classifier: &str) -> LauncherResult<MavenArtifact> {
        let mut maven = MavenArtifact::parse(&self.name)?;
        maven.classifier = Some(classifier.to_string());
        Ok(maven)
    }
}

// ─── Loading & inheritance ───

pub fn versions_dir(minecraft_dir: &Path) -> PathBuf {
    minecraft_dir.join("versions")
}

/// `versions/<id>/<id>.json`
pub fn version_json_path(minecraft_dir: &Path, id: &str) -> PathBuf {
    versions_dir(minecraft_dir)
        .join(id)
        .join(format!("{}.json", id))
}

/// `versions/<id>/<id>.jar`
pub fn version_jar_path(minecraft_dir: &Path, id: &str) -> PathBuf {
    versions_dir(minecraft_dir)
        .join(id)
        .join(format!("{}.jar", id))
}

impl VersionJson {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load an installed version, merging every `inheritsFrom` parent.
    pub fn load_installed(minecraft_dir: &Path, id: &str) -> LauncherResult<Self> {
        let raw = read_version_value(minecraft_dir, id)?;
        let merged = Self::resolve_inheritance(raw, minecraft_dir)?;
        serde_json::from_value(merged).map_err(LauncherError::from)
    }

    /// Walk the `inheritsFrom` chain on disk, folding each parent in.
    pub fn resolve_inheritance(
        mut current: serde_json::Value,
        minecraft_dir: &Path,
    ) -> LauncherResult<serde_json::Value> {
        for _ in 0..MAX_INHERITANCE_DEPTH {
            let Some(parent_id) = current
                .get("inheritsFrom")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
            else {
                return Ok(current);
            };

            debug!("Merging parent version {}", parent_id);
            let parent = read_version_value(minecraft_dir, &parent_id)?;
            current = Self::merge_with_parent_json(&current, &parent);
        }

        Err(LauncherError::Loader(format!(
            "inheritsFrom chain deeper than {} levels",
            MAX_INHERITANCE_DEPTH
        )))
    }

    /// Merge `current` over `parent`: scalar keys override, `libraries` are
    /// concatenated child-first, `arguments.game` / `arguments.jvm` parent-first.
    /// `inheritsFrom` is taken from the parent so the walk continues upwards.
    pub fn merge_with_parent_json(
        current: &serde_json::Value,
        parent: &serde_json::Value,
    ) -> serde_json::Value {
        let mut merged = parent.clone();
        let Some(merged_obj) = merged.as_object_mut() else {
            return current.clone();
        };
        let parent_inherits = merged_obj.get("inheritsFrom").cloned();

        if let Some(obj) = current.as_object() {
            for (key, value) in obj {
                match key.as_str() {
                    "libraries" => {
                        let mut libs = value.as_array().cloned().unwrap_or_default();
                        if let Some(parent_libs) =
                            merged_obj.get("libraries").and_then(|v| v.as_array())
                        {
                            libs.extend(parent_libs.iter().cloned());
                        }
                        merged_obj.insert(key.clone(), serde_json::Value::Array(libs));
                    }
                    "arguments" => {
                        let mut args = merged_obj
                            .get("arguments")
                            .cloned()
                            .unwrap_or_else(|| serde_json::json!({}));
                        for kind in ["game", "jvm"] {
                            let Some(extra) = value.get(kind).and_then(|v| v.as_array()) else {
                                continue;
                            };
                            let mut list = args
                                .get(kind)
                                .and_then(|v| v.as_array())
                                .cloned()
                                .unwrap_or_default();
                            list.extend(extra.iter().cloned());
                            args[kind] = serde_json::Value::Array(list);
                        }
                        merged_obj.insert(key.clone(), args);
                    }
                    "inheritsFrom" => {}
                    _ => {
                        merged_obj.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        match parent_inherits {
            Some(p) => merged_obj.insert("inheritsFrom".into(), p),
            None => merged_obj.remove("inheritsFrom"),
        };
        merged
    }

    /// Top of the `inheritsFrom` chain starting at `id`: the version whose
    /// client jar and natives an installed loader version runs on.
    pub fn inheritance_root(minecraft_dir: &Path, id: &str) -> LauncherResult<String> {
        let mut current = id.to_string();
        for _ in 0..MAX_INHERITANCE_DEPTH {
            let raw = read_version_value(minecraft_dir, &current)?;
            match raw
                .get("inheritsFrom")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                Some(parent) => current = parent.to_string(),
                None => return Ok(current),
            }
        }

        Err(LauncherError::Loader(format!(
            "inheritsFrom chain deeper than {} levels",
            MAX_INHERITANCE_DEPTH
        )))
    }

    /// Id of the jar to put on the classpath.
    pub fn jar_id(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    /// Asset index id, falling back to the legacy `assets` field.
    pub fn asset_index_id(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|ai| ai.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }

    /// Get the required Java major version from the version JSON.
    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(8)
    }
}

fn read_version_value(minecraft_dir: &Path, id: &str) -> LauncherResult<serde_json::Value> {
    let path = version_json_path(minecraft_dir, id);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LauncherError::VersionNotFound(id.to_string()))
        }
        Err(e) => return Err(LauncherError::io(&path, e)),
    };
    Ok(serde_json::from_str(&raw)?)
}
