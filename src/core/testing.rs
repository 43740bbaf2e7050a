// Test fixtures shared across modules: an in-memory HTTP collaborator, a
// recording dependency installer and a `.mrpack` archive builder.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zip::write::SimpleFileOptions;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::HttpFetch;
use crate::core::loaders::DependencyInstaller;
use crate::core::progress::ProgressCallback;

#[derive(Default)]
pub struct MockFetcher {
    files: HashMap<String, Vec<u8>>,
    heads: HashMap<String, u16>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, url: &str, bytes: &[u8]) -> Self {
        self.files.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn with_json(self, url: &str, value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).unwrap();
        self.with_file(url, &body)
    }

    pub fn with_head(mut self, url: &str, status: u16) -> Self {
        self.heads.insert(url.to_string(), status);
        self
    }

    /// Every request seen so far, as `"GET <url>"` / `"HEAD <url>"`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetch for MockFetcher {
    async fn get_bytes(&self, url: &str) -> LauncherResult<Vec<u8>> {
        self.requests.lock().unwrap().push(format!("GET {url}"));
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| LauncherError::DownloadFailed {
                url: url.to_string(),
                reason: "HTTP 404".into(),
                status: Some(404),
            })
    }

    async fn head_status(&self, url: &str) -> LauncherResult<u16> {
        self.requests.lock().unwrap().push(format!("HEAD {url}"));
        Ok(self.heads.get(url).copied().unwrap_or(404))
    }
}

/// Write a zip at `path` from `(entry name, bytes)` pairs, in order.
/// Names ending in `/` become directory entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Write a `.mrpack` whose index is `index` plus the given extra entries.
pub fn write_mrpack(path: &Path, index: &serde_json::Value, extra: &[(&str, &[u8])]) {
    let index_bytes = serde_json::to_vec_pretty(index).unwrap();
    let mut entries: Vec<(&str, &[u8])> = vec![("modrinth.index.json", &index_bytes[..])];
    entries.extend_from_slice(extra);
    write_zip(path, &entries);
}

/// A callback that records every call as `status:<text>`, `max:<n>` or
/// `progress:<n>`.
pub fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<String>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let (status, progress, max) = (events.clone(), events.clone(), events.clone());
    let callback = ProgressCallback::new()
        .on_status(move |text| status.lock().unwrap().push(format!("status:{text}")))
        .on_progress(move |n| progress.lock().unwrap().push(format!("progress:{n}")))
        .on_max(move |n| max.lock().unwrap().push(format!("max:{n}")));
    (callback, events)
}

/// `DependencyInstaller` that records its calls instead of installing.
#[derive(Default)]
pub struct RecordingInstaller {
    calls: Mutex<Vec<String>>,
    dirs: Mutex<Vec<PathBuf>>,
}

impl RecordingInstaller {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Target directory of every call, in call order.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().unwrap().clone()
    }

    fn record(&self, call: String, minecraft_dir: &Path) {
        self.calls.lock().unwrap().push(call);
        self.dirs.lock().unwrap().push(minecraft_dir.to_path_buf());
    }
}

#[async_trait]
impl DependencyInstaller for RecordingInstaller {
    async fn install_minecraft(
        &self,
        version: &str,
        minecraft_dir: &Path,
        _callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        self.record(format!("minecraft {version}"), minecraft_dir);
        Ok(version.to_string())
    }

    async fn install_forge(
        &self,
        forge_version: &str,
        minecraft_dir: &Path,
        _callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        self.record(format!("forge {forge_version}"), minecraft_dir);
        Ok(forge_version.to_string())
    }

    async fn install_fabric(
        &self,
        minecraft_version: &str,
        minecraft_dir: &Path,
        loader_version: &str,
        _callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        self.record(
            format!("fabric {minecraft_version} {loader_version}"),
            minecraft_dir,
        );
        Ok(format!("fabric-loader-{loader_version}-{minecraft_version}"))
    }

    async fn install_quilt(
        &self,
        minecraft_version: &str,
        minecraft_dir: &Path,
        loader_version: &str,
        _callback: &ProgressCallback,
    ) -> LauncherResult<String> {
        self.record(
            format!("quilt {minecraft_version} {loader_version}"),
            minecraft_dir,
        );
        Ok(format!("quilt-loader-{loader_version}-{minecraft_version}"))
    }
}
