use std::path::Path;

use tracing::{info, warn};

use super::index::ModpackManifest;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::HttpFetch;
use crate::core::loaders::{forge_installer_url, DependencyInstaller, LoaderKind};
use crate::core::progress::ProgressCallback;

/// Collaborators of a modpack install.
pub struct ModpackServices<'a> {
    pub installer: &'a dyn DependencyInstaller,
    /// Fetches modpack files; its HTTP collaborator also probes Forge versions.
    pub downloader: &'a Downloader,
    pub forge_maven: &'a str,
}

/// Loaders declared by the manifest, in dispatch order.
fn declared_loaders(manifest: &ModpackManifest) -> Vec<(LoaderKind, &str)> {
    LoaderKind::ALL
        .iter()
        .filter_map(|&kind| manifest.loader_version(kind).map(|v| (kind, v)))
        .collect()
}

/// Version id to launch once the modpack is installed.
pub fn launch_version(manifest: &ModpackManifest) -> String {
    let minecraft = manifest.minecraft_version();
    match declared_loaders(manifest).first() {
        Some((kind, loader)) => kind.launch_version_id(minecraft, loader),
        None => minecraft.to_string(),
    }
}

/// Find the Forge installer version for a modpack's `forge` dependency.
/// `<mc>-<forge>` is tried first, then `<mc>-<forge>-<mc>`; the first
/// candidate whose installer answers HTTP 200 wins.
pub async fn resolve_forge_version(
    fetcher: &dyn HttpFetch,
    forge_maven: &str,
    minecraft_version: &str,
    forge_version: &str,
) -> LauncherResult<String> {
    let candidates = [
        format!("{}-{}", minecraft_version, forge_version),
        format!("{}-{}-{}", minecraft_version, forge_version, minecraft_version),
    ];

    for candidate in candidates {
        let status = fetcher
            .head_status(&forge_installer_url(forge_maven, &candidate))
            .await?;
        if status == 200 {
            return Ok(candidate);
        }
    }

    Err(LauncherError::VersionNotFound(forge_version.to_string()))
}

/// Install `dependencies.minecraft`, then every declared loader in the order
/// Forge, Fabric, Quilt. The same callback is handed to every installer.
pub async fn install_dependencies(
    manifest: &ModpackManifest,
    minecraft_dir: &Path,
    services: &ModpackServices<'_>,
    callback: &ProgressCallback,
) -> LauncherResult<()> {
    let minecraft = manifest.minecraft_version();
    callback.set_status(&format!("Installing Minecraft {}", minecraft));
    services
        .installer
        .install_minecraft(minecraft, minecraft_dir, callback)
        .await?;

    let loaders = declared_loaders(manifest);
    if loaders.len() > 1 {
        warn!(
            "Modpack {} declares {} loaders; installing all of them",
            manifest.name,
            loaders.len()
        );
    }

    for (kind, loader_version) in loaders {
        let installed = match kind {
            LoaderKind::Forge => {
                let forge_version = resolve_forge_version(
                    services.downloader.fetcher(),
                    services.forge_maven,
                    minecraft,
                    loader_version,
                )
                .await?;
                callback.set_status(&format!("Installing Forge {}", forge_version));
                services
                    .installer
                    .install_forge(&forge_version, minecraft_dir, callback)
                    .await?
            }
            LoaderKind::Fabric | LoaderKind::Quilt => {
                callback.set_status(&format!(
                    "Installing {} {} for Minecraft {}",
                    kind, loader_version, minecraft
                ));
                let install = if kind == LoaderKind::Fabric {
                    services
                        .installer
                        .install_fabric(minecraft, minecraft_dir, loader_version, callback)
                } else {
                    services
                        .installer
                        .install_quilt(minecraft, minecraft_dir, loader_version, callback)
                };
                install.await?
            }
        };
        info!("{} installed as {}", kind, installed);
    }

    Ok(())
}
