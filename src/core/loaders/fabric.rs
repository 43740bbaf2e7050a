use super::context::InstallContext;
use super::profile::{self, LoaderVersion};
use crate::core::error::LauncherResult;
use crate::core::http::HttpFetch;

/// Installs Fabric loader profiles from Fabric Meta.
pub struct FabricInstaller;

impl FabricInstaller {
    pub async fn install(
        &self,
        ctx: &InstallContext<'_>,
        minecraft_version: &str,
        loader_version: &str,
    ) -> LauncherResult<String> {
        profile::install_profile(
            ctx,
            &ctx.config.endpoints.fabric_meta,
            "Fabric",
            minecraft_version,
            loader_version,
        )
        .await
    }

    pub async fn list_loader_versions(
        fetcher: &dyn HttpFetch,
        fabric_meta: &str,
        minecraft_version: &str,
    ) -> LauncherResult<Vec<LoaderVersion>> {
        profile::list_loader_versions(fetcher, fabric_meta, minecraft_version).await
    }
}
