// ─── Modpack Index ───
// Data model of `modrinth.index.json` and the archive reader.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderKind;

pub const INDEX_ENTRY: &str = "modrinth.index.json";

/// Parsed `modrinth.index.json`. Read once per call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackManifest {
    pub format_version: u32,
    #[serde(default = "default_game")]
    pub game: String,
    pub version_id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    /// `minecraft` plus at most one of `forge`, `fabric-loader`, `quilt-loader`.
    pub dependencies: HashMap<String, String>,
}

fn default_game() -> String {
    "minecraft".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    /// Destination relative to the modpack directory.
    pub path: String,
    pub hashes: FileHashes,
    #[serde(default)]
    pub env: Option<FileEnv>,
    /// Candidate URLs; the first is used.
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileHashes {
    pub sha1: String,
    /// Carried for completeness, not verified.
    #[serde(default)]
    pub sha512: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileEnv {
    #[serde(default)]
    pub client: Option<EnvSupport>,
    #[serde(default)]
    pub server: Option<EnvSupport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvSupport {
    Required,
    Optional,
    Unsupported,
}

impl ManifestFile {
    /// Client-side support; an absent `env` block or `client` key means required.
    pub fn client_support(&self) -> EnvSupport {
        self.env
            .as_ref()
            .and_then(|env| env.client)
            .unwrap_or(EnvSupport::Required)
    }
}

impl ModpackManifest {
    /// Always present on a manifest returned by [`read_manifest`].
    pub fn minecraft_version(&self) -> &str {
        self.dependencies
            .get("minecraft")
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn loader_version(&self, kind: LoaderKind) -> Option<&str> {
        self.dependencies
            .get(kind.dependency_key())
            .map(String::as_str)
    }

    /// Paths of files the caller may opt into, in manifest order.
    pub fn optional_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.client_support() == EnvSupport::Optional)
            .map(|f| f.path.clone())
            .collect()
    }
}

/// Caller choices for one install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallOptions {
    /// Optional files to install, by manifest path.
    pub optional_files: HashSet<String>,
    /// Stop after override extraction.
    pub skip_dependencies_install: bool,
}

impl InstallOptions {
    pub fn with_optional_file(mut self, path: impl Into<String>) -> Self {
        self.optional_files.insert(path.into());
        self
    }
}

/// Preview of a modpack, read without installing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModpackSummary {
    pub name: String,
    pub summary: String,
    pub version_id: String,
    pub format_version: u32,
    pub minecraft_version: String,
    pub optional_files: Vec<String>,
}

impl From<&ModpackManifest> for ModpackSummary {
    fn from(manifest: &ModpackManifest) -> Self {
        Self {
            name: manifest.name.clone(),
            summary: manifest.summary.clone(),
            version_id: manifest.version_id.clone(),
            format_version: manifest.format_version,
            minecraft_version: manifest.minecraft_version().to_string(),
            optional_files: manifest.optional_files(),
        }
    }
}

/// Open `archive_path` as a zip. Missing file is `ArchiveNotFound`, anything
/// that is not a zip is `MalformedArchive`.
pub fn open_archive(archive_path: &Path) -> LauncherResult<ZipArchive<File>> {
    if !archive_path.exists() {
        return Err(LauncherError::ArchiveNotFound(archive_path.to_path_buf()));
    }
    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    ZipArchive::new(file).map_err(|e| {
        LauncherError::MalformedArchive(format!("{}: {}", archive_path.display(), e))
    })
}

pub fn read_manifest(archive_path: &Path) -> LauncherResult<ModpackManifest> {
    let mut archive = open_archive(archive_path)?;
    read_manifest_from(&mut archive)
}

pub(crate) fn read_manifest_from<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> LauncherResult<ModpackManifest> {
    let mut entry = archive
        .by_name(INDEX_ENTRY)
        .map_err(|_| LauncherError::MalformedArchive(format!("missing {}", INDEX_ENTRY)))?;
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;

    let manifest: ModpackManifest = serde_json::from_slice(&raw)
        .map_err(|e| LauncherError::MalformedArchive(format!("invalid {}: {}", INDEX_ENTRY, e)))?;

    if manifest.minecraft_version().is_empty() {
        return Err(LauncherError::MalformedArchive(
            "dependencies.minecraft is missing".into(),
        ));
    }
    Ok(manifest)
}

/// Summary fields of the modpack at `archive_path`. No network, no writes.
pub fn get_information(archive_path: &Path) -> LauncherResult<ModpackSummary> {
    let manifest = read_manifest(archive_path)?;
    Ok(ModpackSummary::from(&manifest))
}
