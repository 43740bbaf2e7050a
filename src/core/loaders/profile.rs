// Fabric and Quilt publish ready-made version JSONs ("profiles") through
// near-identical meta APIs. Both installers go through this module.

use serde::Deserialize;
use tracing::{debug, info};

use super::context::InstallContext;
use super::vanilla::VanillaInstaller;
use crate::core::downloader::write_file;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{fetch_json, HttpFetch};
use crate::core::version::version_json_path;

/// The bits of a loader profile needed before it is written to disk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileHeader {
    id: String,
    #[serde(default)]
    inherits_from: Option<String>,
    main_class: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderVersion {
    pub version: String,
    /// Fabric marks stable builds; Quilt does not report stability.
    #[serde(default)]
    pub stable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LoaderListing {
    loader: LoaderVersion,
}

/// Install the profile of `loader_version` for `minecraft_version` from the
/// meta service at `meta_base`. Returns the installed version id.
pub(super) async fn install_profile(
    ctx: &InstallContext<'_>,
    meta_base: &str,
    loader_name: &str,
    minecraft_version: &str,
    loader_version: &str,
) -> LauncherResult<String> {
    info!(
        "Installing {} {} for Minecraft {}",
        loader_name, loader_version, minecraft_version
    );

    let url = format!(
        "{}/versions/loader/{}/{}/profile/json",
        meta_base.trim_end_matches('/'),
        minecraft_version,
        loader_version
    );
    let raw = match ctx.downloader.fetcher().get_bytes(&url).await {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => {
            return Err(LauncherError::VersionNotFound(format!(
                "{} {} for Minecraft {}",
                loader_name, loader_version, minecraft_version
            )));
        }
        Err(e) => return Err(e),
    };

    let header: ProfileHeader = serde_json::from_slice(&raw).map_err(|e| {
        LauncherError::LoaderApi(format!("{} profile from {} is invalid: {}", loader_name, url, e))
    })?;
    if header.main_class.is_empty() {
        return Err(LauncherError::LoaderApi(format!(
            "{} profile missing mainClass",
            loader_name
        )));
    }

    let vanilla = VanillaInstaller;
    let parent = header.inherits_from.as_deref().unwrap_or(minecraft_version);
    vanilla.install(ctx, parent).await?;

    write_file(&version_json_path(ctx.minecraft_dir, &header.id), &raw).await?;
    debug!("Saved {} profile as {}", loader_name, header.id);

    vanilla.install_local(ctx, &header.id).await?;

    info!("{} installed successfully as {}", loader_name, header.id);
    Ok(header.id)
}

/// Loader versions the meta service offers for `minecraft_version`, newest first.
pub async fn list_loader_versions(
    fetcher: &dyn HttpFetch,
    meta_base: &str,
    minecraft_version: &str,
) -> LauncherResult<Vec<LoaderVersion>> {
    let url = format!(
        "{}/versions/loader/{}",
        meta_base.trim_end_matches('/'),
        minecraft_version
    );
    let listing: Vec<LoaderListing> = fetch_json(fetcher, &url).await?;
    Ok(listing.into_iter().map(|l| l.loader).collect())
}
