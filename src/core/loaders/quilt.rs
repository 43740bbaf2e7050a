use super::context::InstallContext;
use super::profile::{self, LoaderVersion};
use crate::core::error::LauncherResult;
use crate::core::http::HttpFetch;

/// Installs Quilt loader via the Quilt Meta API (nearly identical to Fabric's API).
pub struct QuiltInstaller;

impl QuiltInstaller {
    pub async fn install(
        &self,
        ctx: &InstallContext<'_>,
        minecraft_version: &str,
        loader_version: &str,
    ) -> LauncherResult<String> {
        profile::install_profile(
            ctx,
            &ctx.config.endpoints.quilt_meta,
            "Quilt",
            minecraft_version,
            loader_version,
        )
        .await
    }

    pub async fn list_loader_versions(
        fetcher: &dyn HttpFetch,
        quilt_meta: &str,
        minecraft_version: &str,
    ) -> LauncherResult<Vec<LoaderVersion>> {
        profile::list_loader_versions(fetcher, quilt_meta, minecraft_version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockFetcher;

    #[tokio::test]
    async fn quilt_listing_has_no_stability_flag() {
        let fetcher = MockFetcher::new().with_json(
            "https://quilt/v3/versions/loader/1.20.1",
            &serde_json::json!([
                {"loader": {"separator": "-", "build": 2, "maven": "org.quiltmc:quilt-loader:0.19.2", "version": "0.19.2"}}
            ]),
        );

        let versions =
            QuiltInstaller::list_loader_versions(&fetcher, "https://quilt/v3", "1.20.1")
                .await
                .unwrap();
        assert_eq!(versions[0].version, "0.19.2");
        assert!(versions[0].stable.is_none());
    }
}
