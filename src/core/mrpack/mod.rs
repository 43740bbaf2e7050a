// ─── Modrinth modpacks ───
// Reads `.mrpack` archives, downloads their files, extracts overrides and
// installs the game plus the declared loader.

pub mod dependencies;
pub mod filter;
pub mod index;
pub mod install;
pub mod overrides;

use std::path::Path;

use crate::core::error::LauncherResult;

pub use dependencies::{install_dependencies, launch_version, resolve_forge_version, ModpackServices};
pub use filter::filter_files;
pub use index::{
    get_information, read_manifest, EnvSupport, FileEnv, FileHashes, InstallOptions,
    ManifestFile, ModpackManifest, ModpackSummary,
};
pub use install::{install, install_with};
pub use overrides::extract_overrides;

/// Version id to pass to the launch command builder after installing the
/// modpack at `archive_path`.
pub fn get_launch_version(archive_path: &Path) -> LauncherResult<String> {
    let manifest = read_manifest(archive_path)?;
    Ok(launch_version(&manifest))
}
