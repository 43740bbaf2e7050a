use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::ProgressCallback;
use crate::core::version::AssetIndexInfo;

/// Downloads the asset index of a version and every object it references.
pub struct AssetManager;

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// `<xx>/<hash>` where `xx` is the first two hex digits.
    pub fn object_path(&self) -> String {
        format!("{}/{}", &self.hash[..2.min(self.hash.len())], self.hash)
    }
}

impl AssetManager {
    /// Save the index to `assets/indexes/<id>.json` and fetch all objects
    /// into `assets/objects/<xx>/<hash>`.
    pub async fn download_assets(
        info: &AssetIndexInfo,
        assets_dir: &Path,
        resources_base: &str,
        downloader: &Downloader,
        callback: &ProgressCallback,
    ) -> LauncherResult<()> {
        // 1. Asset index JSON
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", info.id));
        downloader
            .download_file(&info.url, &index_path, info.sha1.as_deref())
            .await?;

        let index_text = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|e| LauncherError::io(&index_path, e))?;
        let index: AssetIndex = serde_json::from_str(&index_text)?;

        // 2. One download entry per object; existing, matching files are skipped
        //    by the downloader itself.
        let objects_dir = assets_dir.join("objects");
        let base = resources_base.trim_end_matches('/');
        let entries: Vec<DownloadEntry> = index
            .objects
            .values()
            .map(|obj| {
                let rel = obj.object_path();
                DownloadEntry {
                    url: format!("{}/{}", base, rel),
                    dest: objects_dir.join(&rel),
                    sha1: Some(obj.hash.clone()),
                }
            })
            .collect();

        info!(
            "Asset index {} lists {} objects",
            info.id,
            entries.len()
        );

        // 3. Batch download
        callback.set_status("Download Assets");
        callback.set_max(entries.len() as u64);
        callback.set_progress(0);
        downloader.download_batch(entries, callback).await
    }
}
