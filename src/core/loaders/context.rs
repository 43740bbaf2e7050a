use std::path::{Path, PathBuf};

use crate::core::config::LauncherConfig;
use crate::core::downloader::Downloader;
use crate::core::progress::ProgressCallback;

/// Everything an installer needs for one install call.
/// Keeps the installer signatures stable as the context grows.
pub struct InstallContext<'a> {
    pub minecraft_dir: &'a Path,
    pub downloader: &'a Downloader,
    pub config: &'a LauncherConfig,
    pub callback: &'a ProgressCallback,
}

impl InstallContext<'_> {
    pub fn libraries_dir(&self) -> PathBuf {
        self.minecraft_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.minecraft_dir.join("assets")
    }
}
