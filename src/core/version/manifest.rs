// ─── Version Manifest ───
// Fetching and querying the Mojang version manifest v2.

use serde::Deserialize;
use tracing::info;

use crate::core::error::LauncherResult;
use crate::core::http::{fetch_json, HttpFetch};

/// Top-level Mojang version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(fetcher: &dyn HttpFetch, url: &str) -> LauncherResult<Self> {
        info!("Fetching Minecraft version manifest...");
        let manifest: VersionManifest = fetch_json(fetcher, url).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn latest_release(&self) -> Option<&VersionEntry> {
        self.find_version(&self.latest.release)
    }

    /// All release (non-snapshot) versions, newest first.
    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockFetcher;

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "latest": { "release": "1.20.1", "snapshot": "23w31a" },
            "versions": [
                {
                    "id": "23w31a", "type": "snapshot",
                    "releaseTime": "2023-08-01T00:00:00+00:00",
                    "url": "https://meta/23w31a.json", "sha1": "aa"
                },
                {
                    "id": "1.20.1", "type": "release",
                    "releaseTime": "2023-06-12T00:00:00+00:00",
                    "url": "https://meta/1.20.1.json", "sha1": "bb"
                }
            ]
        })
    }

    #[tokio::test]
    async fn fetch_and_query() {
        let fetcher = MockFetcher::new().with_json("https://meta/manifest.json", &sample());
        let manifest = VersionManifest::fetch(&fetcher, "https://meta/manifest.json")
            .await
            .unwrap();

        assert_eq!(manifest.latest_release().unwrap().id, "1.20.1");
        assert_eq!(manifest.releases().len(), 1);
        assert_eq!(
            manifest.find_version("23w31a").unwrap().release_time,
            "2023-08-01T00:00:00+00:00"
        );
        assert!(manifest.find_version("1.0-nope").is_none());
    }
}
