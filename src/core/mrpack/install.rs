use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::dependencies::{install_dependencies, ModpackServices};
use super::filter::filter_files;
use super::index::{read_manifest, InstallOptions, ManifestFile};
use super::overrides::extract_overrides;
use crate::core::config::LauncherConfig;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::GameInstaller;
use crate::core::paths::{join_inside_root, resolve_path};
use crate::core::progress::ProgressCallback;

/// Install the modpack at `archive_path` into `install_root`.
///
/// Modpack files and overrides go to `override_root` when given, otherwise to
/// `install_root`; the game and its loader are always installed into
/// `install_root`. Uses the official services with default settings.
pub async fn install(
    archive_path: &Path,
    install_root: &Path,
    override_root: Option<&Path>,
    callback: Option<&ProgressCallback>,
    options: Option<&InstallOptions>,
) -> LauncherResult<()> {
    let installer = GameInstaller::new(LauncherConfig::default())?;
    let services = ModpackServices {
        installer: &installer,
        downloader: installer.downloader(),
        forge_maven: &installer.config().endpoints.forge_maven,
    };
    install_with(
        archive_path,
        install_root,
        override_root,
        callback,
        options,
        &services,
    )
    .await
}

/// [`install`] with caller-provided collaborators.
pub async fn install_with(
    archive_path: &Path,
    install_root: &Path,
    override_root: Option<&Path>,
    callback: Option<&ProgressCallback>,
    options: Option<&InstallOptions>,
    services: &ModpackServices<'_>,
) -> LauncherResult<()> {
    let unset = ProgressCallback::new();
    let callback = callback.unwrap_or(&unset);
    let defaults = InstallOptions::default();
    let options = options.unwrap_or(&defaults);

    let archive_path = resolve_path(archive_path)?;
    let manifest = read_manifest(&archive_path)?;
    info!(
        "Installing modpack {} {} (Minecraft {})",
        manifest.name,
        manifest.version_id,
        manifest.minecraft_version()
    );

    let install_root = prepare_root(install_root)?;
    let content_root = match override_root {
        Some(dir) => prepare_root(dir)?,
        None => install_root.clone(),
    };

    let files = filter_files(&manifest.files, options);
    download_files(&files, &content_root, services.downloader, callback).await?;

    let extracted = extract_overrides(&archive_path, &content_root, callback)?;
    debug!("Extracted {} override files", extracted);

    if options.skip_dependencies_install {
        info!("Skipping dependency install for {}", manifest.name);
        return Ok(());
    }

    install_dependencies(&manifest, &install_root, services, callback).await
}

/// Make `dir` absolute and create it.
fn prepare_root(dir: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| LauncherError::io(dir, e))?;
    resolve_path(dir)
}

/// Download the filtered files in manifest order. Every destination is
/// guarded before the first request goes out.
async fn download_files(
    files: &[&ManifestFile],
    root: &Path,
    downloader: &Downloader,
    callback: &ProgressCallback,
) -> LauncherResult<()> {
    let mut jobs = Vec::with_capacity(files.len());
    for file in files {
        let dest = join_inside_root(root, &file.path)?;
        let url = file.downloads.first().ok_or_else(|| {
            LauncherError::MalformedArchive(format!("{} has no download URL", file.path))
        })?;
        jobs.push((url.as_str(), dest, file.hashes.sha1.as_str()));
    }

    callback.set_status("Download mrpack files");
    callback.set_max(jobs.len() as u64);

    for (done, (url, dest, sha1)) in jobs.iter().enumerate() {
        if downloader.download_file(url, dest, Some(*sha1)).await? {
            debug!("Fetched {}", url);
        }
        callback.set_progress(done as u64 + 1);
    }

    Ok(())
}
