use std::io::Read;
use std::path::Path;

use futures_util::future::BoxFuture;
use tracing::{debug, info};

use crate::core::assets::AssetManager;
use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::join_inside_root;
use crate::core::version::{
    version_jar_path, version_json_path, versions_dir, VersionJson, VersionManifest,
};

use super::context::InstallContext;

/// Installs a game version: version JSON, libraries and natives, client jar,
/// assets and logging config. Versions that inherit from another one (loader
/// profiles) get their parent installed first.
pub struct VanillaInstaller;

impl VanillaInstaller {
    /// Install `version_id`, looking it up in the Mojang manifest first and
    /// falling back to an already present `versions/<id>/<id>.json`.
    pub async fn install(&self, ctx: &InstallContext<'_>, version_id: &str) -> LauncherResult<String> {
        info!("Installing Minecraft {}", version_id);

        let manifest =
            VersionManifest::fetch(ctx.downloader.fetcher(), &ctx.config.endpoints.version_manifest)
                .await?;
        let json_path = version_json_path(ctx.minecraft_dir, version_id);

        match manifest.find_version(version_id) {
            Some(entry) => {
                ctx.downloader
                    .download_file(&entry.url, &json_path, entry.sha1.as_deref())
                    .await?;
            }
            None if json_path.is_file() => {
                debug!("{} not in manifest, installing from local JSON", version_id);
            }
            None => return Err(LauncherError::VersionNotFound(version_id.to_string())),
        }

        self.install_local(ctx, version_id).await?;
        info!("Minecraft {} installed successfully", version_id);
        Ok(version_id.to_string())
    }

    /// Install a version whose JSON is already on disk.
    pub fn install_local<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        version_id: &'a str,
    ) -> BoxFuture<'a, LauncherResult<()>> {
        Box::pin(async move {
            let json_path = version_json_path(ctx.minecraft_dir, version_id);
            let raw = tokio::fs::read_to_string(&json_path)
                .await
                .map_err(|e| LauncherError::io(&json_path, e))?;
            let version = VersionJson::parse(&raw)?;

            if let Some(parent) = version.inherits_from.as_deref() {
                if !version_json_path(ctx.minecraft_dir, parent).is_file() {
                    self.install(ctx, parent).await?;
                } else {
                    self.install_local(ctx, parent).await?;
                }
            }

            self.download_libraries(ctx, &version).await?;
            self.download_client(ctx, &version).await?;

            if let Some(asset_index) = &version.asset_index {
                AssetManager::download_assets(
                    asset_index,
                    &ctx.assets_dir(),
                    &ctx.config.endpoints.resources,
                    ctx.downloader,
                    ctx.callback,
                )
                .await?;
            }

            if let Some(logging) = version.logging.as_ref().and_then(|l| l.client.as_ref()) {
                let dest = ctx
                    .assets_dir()
                    .join("log_configs")
                    .join(&logging.file.id);
                ctx.downloader
                    .download_file(&logging.file.url, &dest, Some(&logging.file.sha1))
                    .await?;
            }

            Ok(())
        })
    }

    /// Download allowed libraries and native jars, then unpack natives into
    /// `versions/<id>/natives`.
    async fn download_libraries(
        &self,
        ctx: &InstallContext<'_>,
        version: &VersionJson,
    ) -> LauncherResult<()> {
        let libs_dir = ctx.libraries_dir();
        let mut entries: Vec<DownloadEntry> = Vec::new();
        let mut natives = Vec::new();

        for lib in &version.libraries {
            if !lib.is_allowed_for_current_os() {
                debug!("Skipping library (OS rule): {}", lib.name);
                continue;
            }

            if let Some(job) = lib.artifact_download(&libs_dir, &ctx.config.endpoints.libraries)? {
                entries.push(job);
            }
            if let Some(job) = lib.native_download(&libs_dir)? {
                let exclude = lib
                    .extract
                    .as_ref()
                    .map(|e| e.exclude.clone())
                    .unwrap_or_default();
                natives.push((job.dest.clone(), exclude));
                entries.push(job);
            }
        }

        // Unhashed entries cannot be validated, so an existing file is trusted.
        entries.retain(|e| e.sha1.is_some() || !e.dest.exists());

        ctx.callback.set_status("Download Libraries");
        ctx.callback.set_max(entries.len() as u64);
        ctx.callback.set_progress(0);
        ctx.downloader.download_batch(entries, ctx.callback).await?;

        if !natives.is_empty() {
            let natives_dir = versions_dir(ctx.minecraft_dir)
                .join(&version.id)
                .join("natives");
            for (jar, exclude) in &natives {
                extract_natives(jar, &natives_dir, exclude)?;
            }
        }

        info!(
            "Processed {} libraries for {}",
            version.libraries.len(),
            version.id
        );
        Ok(())
    }

    async fn download_client(
        &self,
        ctx: &InstallContext<'_>,
        version: &VersionJson,
    ) -> LauncherResult<()> {
        let Some(client) = version.downloads.as_ref().and_then(|d| d.client.as_ref()) else {
            return Ok(());
        };

        ctx.callback.set_status("Download Client");
        let jar = version_jar_path(ctx.minecraft_dir, &version.id);
        ctx.downloader
            .download_file(&client.url, &jar, Some(&client.sha1))
            .await?;
        debug!("Client jar ready at {:?}", jar);
        Ok(())
    }
}

/// Unpack a natives jar, skipping directories and excluded prefixes
/// (`META-INF/` always). Entry names are guarded against escaping `natives_dir`.
pub fn extract_natives(jar: &Path, natives_dir: &Path, exclude: &[String]) -> LauncherResult<()> {
    let file = std::fs::File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(natives_dir).map_err(|e| LauncherError::io(natives_dir, e))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir()
            || name.starts_with("META-INF/")
            || exclude.iter().any(|prefix| name.starts_with(prefix.as_str()))
        {
            continue;
        }

        let dest = join_inside_root(natives_dir, &name)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        std::fs::write(&dest, bytes).map_err(|e| LauncherError::io(&dest, e))?;
    }

    Ok(())
}
