use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::auth::LaunchAccountProfile;
use crate::core::error::LauncherResult;
use crate::core::version::{version_jar_path, versions_dir, LaunchFeatures, VersionJson};

/// Everything the command line needs besides the installed version.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub account: LaunchAccountProfile,
    /// `None` → `java` from `PATH`.
    pub java_executable: Option<PathBuf>,
    /// Extra JVM switches placed before the version's own, e.g. `-Xmx4G`.
    pub jvm_arguments: Vec<String>,
    /// `None` → the Minecraft directory.
    pub game_directory: Option<PathBuf>,
    /// `None` → `versions/<base version>/natives`.
    pub natives_directory: Option<PathBuf>,
    /// Window size as `(width, height)`.
    pub resolution: Option<(u32, u32)>,
    pub demo: bool,
    pub launcher_name: String,
    pub launcher_version: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            account: LaunchAccountProfile::default(),
            java_executable: None,
            jvm_arguments: Vec::new(),
            game_directory: None,
            natives_directory: None,
            resolution: None,
            demo: false,
            launcher_name: "launcher-core".into(),
            launcher_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Build the full command line (Java executable first) for an installed
/// version. Fails with `VersionNotFound` when the version or one of its
/// parents is not installed.
pub fn build_command(
    version_id: &str,
    minecraft_dir: &Path,
    options: &LaunchOptions,
) -> LauncherResult<Vec<String>> {
    let version = VersionJson::load_installed(minecraft_dir, version_id)?;
    let base_id = VersionJson::inheritance_root(minecraft_dir, version_id)?;
    let jar_id = version.jar.clone().unwrap_or_else(|| base_id.clone());

    let libraries_dir = minecraft_dir.join("libraries");
    let assets_dir = minecraft_dir.join("assets");
    let natives_dir = options
        .natives_directory
        .clone()
        .unwrap_or_else(|| versions_dir(minecraft_dir).join(&base_id).join("natives"));
    let game_dir = options
        .game_directory
        .clone()
        .unwrap_or_else(|| minecraft_dir.to_path_buf());

    let classpath = build_classpath(&version, &libraries_dir, &version_jar_path(minecraft_dir, &jar_id))?;
    let features = LaunchFeatures {
        is_demo_user: options.demo,
        has_custom_resolution: options.resolution.is_some(),
    };
    let placeholders = Placeholders {
        natives_directory: path_str(&natives_dir),
        library_directory: path_str(&libraries_dir),
        classpath,
        game_directory: path_str(&game_dir),
        assets_root: path_str(&assets_dir),
        game_assets: path_str(&assets_dir.join("virtual").join("legacy")),
        assets_index_name: version.asset_index_id().to_string(),
        version_name: version_id.to_string(),
        version_type: version
            .version_type
            .clone()
            .unwrap_or_else(|| "release".into()),
        resolution: options.resolution,
        options,
    };

    let mut command = vec![options
        .java_executable
        .as_deref()
        .map(path_str)
        .unwrap_or_else(|| "java".into())];
    command.extend(options.jvm_arguments.iter().cloned());

    let raw_jvm: Vec<String> = match &version.arguments {
        Some(arguments) if !arguments.jvm.is_empty() => arguments
            .jvm
            .iter()
            .flat_map(|arg| arg.values(&features))
            .collect(),
        _ => vec![
            "-Djava.library.path=${natives_directory}".into(),
            "-cp".into(),
            "${classpath}".into(),
        ],
    };
    command.extend(sanitize_args(&raw_jvm, &placeholders));

    if let Some(logging) = version.logging.as_ref().and_then(|l| l.client.as_ref()) {
        let config = assets_dir.join("log_configs").join(&logging.file.id);
        command.push(logging.argument.replace("${path}", &path_str(&config)));
    }

    command.push(version.main_class.clone());

    let raw_game: Vec<String> = match (&version.arguments, &version.minecraft_arguments) {
        (Some(arguments), _) if !arguments.game.is_empty() => arguments
            .game
            .iter()
            .flat_map(|arg| arg.values(&features))
            .collect(),
        (_, Some(legacy)) => {
            let mut args: Vec<String> = legacy.split_whitespace().map(str::to_string).collect();
            if options.resolution.is_some() {
                args.extend(
                    ["--width", "${resolution_width}", "--height", "${resolution_height}"]
                        .map(String::from),
                );
            }
            if options.demo {
                args.push("--demo".into());
            }
            args
        }
        _ => Vec::new(),
    };
    command.extend(sanitize_args(&raw_game, &placeholders));

    debug!("Launch command for {} has {} parts", version_id, command.len());
    Ok(command)
}

/// Allowed libraries in version order (loader libraries before the game's),
/// each path once, then the game jar.
fn build_classpath(
    version: &VersionJson,
    libraries_dir: &Path,
    game_jar: &Path,
) -> LauncherResult<String> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for lib in &version.libraries {
        if !lib.is_allowed_for_current_os() {
            continue;
        }
        // Native-only entries are unpacked into the natives directory.
        if lib.downloads.as_ref().is_some_and(|d| d.artifact.is_none()) {
            continue;
        }
        let path = path_str(&lib.library_path(libraries_dir)?);
        if seen.insert(path.clone()) {
            entries.push(path);
        }
    }
    entries.push(path_str(game_jar));

    Ok(entries.join(get_classpath_separator()))
}

struct Placeholders<'a> {
    natives_directory: String,
    library_directory: String,
    classpath: String,
    game_directory: String,
    assets_root: String,
    game_assets: String,
    assets_index_name: String,
    version_name: String,
    version_type: String,
    resolution: Option<(u32, u32)>,
    options: &'a LaunchOptions,
}

impl Placeholders<'_> {
    fn substitute(&self, arg: &str) -> String {
        let account = &self.options.account;
        let mut resolved = arg
            .replace("${natives_directory}", &self.natives_directory)
            .replace("${library_directory}", &self.library_directory)
            .replace("${classpath_separator}", get_classpath_separator())
            .replace("${classpath}", &self.classpath)
            .replace("${launcher_name}", &self.options.launcher_name)
            .replace("${launcher_version}", &self.options.launcher_version)
            .replace("${game_directory}", &self.game_directory)
            .replace("${assets_root}", &self.assets_root)
            .replace("${game_assets}", &self.game_assets)
            .replace("${assets_index_name}", &self.assets_index_name)
            .replace("${version_name}", &self.version_name)
            .replace("${version_type}", &self.version_type)
            .replace("${auth_player_name}", &account.username)
            .replace("${auth_uuid}", &account.uuid)
            .replace("${auth_access_token}", &account.access_token)
            .replace("${auth_session}", &account.access_token)
            .replace("${auth_xuid}", &account.xuid)
            .replace("${clientid}", &account.client_id)
            .replace("${user_type}", &account.user_type)
            .replace("${user_properties}", "{}");

        if let Some((width, height)) = self.resolution {
            resolved = resolved
                .replace("${resolution_width}", &width.to_string())
                .replace("${resolution_height}", &height.to_string());
        }
        resolved
    }
}

fn sanitize_args(raw_args: &[String], placeholders: &Placeholders<'_>) -> Vec<String> {
    let mut sanitized = Vec::new();

    for arg in raw_args {
        let resolved = placeholders.substitute(arg);

        // A value we cannot fill takes its option flag with it.
        if resolved.contains("${") {
            if !resolved.starts_with('-') {
                drop_dangling_option(&mut sanitized);
            }
            continue;
        }

        sanitized.push(resolved);
    }

    sanitized
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}
