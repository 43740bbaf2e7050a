use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::LauncherConfig;
use crate::core::downloader::Downloader;
use crate::core::error::LauncherResult;
use crate::core::http::{HttpFetch, ReqwestFetcher};
use crate::core::progress::ProgressCallback;

use super::{
    context::InstallContext, fabric::FabricInstaller, forge::ForgeInstaller,
    quilt::QuiltInstaller, vanilla::VanillaInstaller,
};

/// Mod loaders a modpack can declare next to `minecraft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Forge,
    Fabric,
    Quilt,
}

impl LoaderKind {
    /// Dispatch and naming order.
    pub const ALL: [LoaderKind; 3] = [LoaderKind::Forge, LoaderKind::Fabric, LoaderKind::Quilt];

    /// Key used in a modpack's `dependencies` map.
    pub fn dependency_key(self) -> &'static str {
        match self {
            LoaderKind::Forge => "forge",
            LoaderKind::Fabric => "fabric-loader",
            LoaderKind::Quilt => "quilt-loader",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LoaderKind::Forge => "Forge",
            LoaderKind::Fabric => "Fabric",
            LoaderKind::Quilt => "Quilt",
        }
    }

    /// Version id the loader installs under for `minecraft_version`.
    pub fn launch_version_id(self, minecraft_version: &str, loader_version: &str) -> String {
        match self {
            LoaderKind::Forge => format!("{}-forge-{}", minecraft_version, loader_version),
            LoaderKind::Fabric => format!("fabric-loader-{}-{}", loader_version, minecraft_version),
            LoaderKind::Quilt => format!("quilt-loader-{}-{}", loader_version, minecraft_version),
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The installers a modpack install delegates to. Each returns the id of the
/// version it installed.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install_minecraft(
        &self,
        version: &str,
        minecraft_dir: &Path,
        callback: &ProgressCallback,
    ) -> LauncherResult<String>;

    /// `forge_version` is the full installer version, e.g. `1.20.1-47.1.0`.
    async fn install_forge(
        &self,
        forge_version: &str,
        minecraft_dir: &Path,
        callback: &ProgressCallback,
    ) -> LauncherResult<String>;

    async fn install_fabric(
        &self,
        minecraft_version: &str,
        minecraft_dir: &Path,
        loader_version: &str,
        callback: &ProgressCallback,
    ) -> LauncherResult<String>;

    async fn install_quilt(
        &self,
        minecraft_version: &str,
        minecraft_dir: &Path,
        loader_version: &str,
        callback: &ProgressCallback,
    ) -> LauncherResult<String>;
}

/// Network-backed `DependencyInstaller` over the vanilla and loader installers.
#[derive(Clone)]
pub struct GameInstaller {
    downloader: Downloader,
    config: Arc<LauncherConfig>,
}

impl GameInstaller {
    pub fn new(config: LauncherConfig) -> LauncherResult<Self> {
        let fetcher = ReqwestFetcher::with_user_agent(&config.user_agent)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: LauncherConfig, fetcher: Arc<dyn HttpFetch>) -> Self {
        let downloader = Downloader::new(fetcher).with_concurrency(config.concurrency);
        Self {
            downloader,
            config: Arc::new(config),
        }
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    fn context<'a>(
        &'a self,
        minecraft_dir: &'a Path,
        callback: &'a ProgressCallback,
    ) -> InstallContext<'a> {
        InstallContext {
            minecraft_dir,
            downloader: &self.downloader,
            config: &self.config,
            callback,
        }
    }
}

#[async_trait]
impl DependencyInstaller for GameInstaller {
    async fn install_minecraft(
        &self,
        version: &str,
        minecraft_dir: &Path,
        callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        let ctx = self.context(minecraft_dir, callback);
        VanillaInstaller.install(&ctx, version).await
    }

    async fn install_forge(
        &self,
        forge_version: &str,
        minecraft_dir: &Path,
        callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        let ctx = self.context(minecraft_dir, callback);
        ForgeInstaller.install(&ctx, forge_version).await
    }

    async fn install_fabric(
        &self,
        minecraft_version: &str,
        minecraft_dir: &Path,
        loader_version: &str,
        callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        let ctx = self.context(minecraft_dir, callback);
        FabricInstaller
            .install(&ctx, minecraft_version, loader_version)
            .await
    }

    async fn install_quilt(
        &self,
        minecraft_version: &str,
        minecraft_dir: &Path,
        loader_version: &str,
        callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        let ctx = self.context(minecraft_dir, callback);
        QuiltInstaller
            .install(&ctx, minecraft_version, loader_version)
            .await
    }
}
