use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::HttpFetch;
use crate::core::progress::ProgressCallback;

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

/// SHA-1 validated downloader on top of an `HttpFetch` collaborator.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn HttpFetch>,
    /// Maximum number of parallel downloads in `download_batch`.
    concurrency: usize,
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            concurrency: 8,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn fetcher(&self) -> &dyn HttpFetch {
        self.fetcher.as_ref()
    }

    // ── Single file download ────────────────────────────

    /// Download a single file to `dest`, optionally validating SHA-1.
    ///
    /// An existing file whose hash already matches is left untouched and
    /// `Ok(false)` is returned. The body is hashed in memory before anything
    /// is written, so a mismatching download never reaches the disk.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<bool> {
        if let Some(expected) = sha1_expected {
            if dest.is_file() && Self::validate_sha1(dest, expected).await? {
                debug!("Up to date: {:?}", dest);
                return Ok(false);
            }
        }

        let bytes = self.fetcher.get_bytes(url).await?;

        if let Some(expected) = sha1_expected {
            let actual = sha1_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::ChecksumMismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        write_file(dest, &bytes).await?;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(true)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// `callback.set_progress` is bumped as each file finishes. Every entry is
    /// attempted; the first failure (if any) is returned afterwards.
    pub async fn download_batch(
        &self,
        entries: Vec<DownloadEntry>,
        callback: &ProgressCallback,
    ) -> LauncherResult<()> {
        info!(
            "Starting batch download: {} files, concurrency={}",
            entries.len(),
            self.concurrency
        );

        let done = AtomicU64::new(0);
        let results: Vec<LauncherResult<bool>> = stream::iter(entries)
            .map(|entry| {
                let done = &done;
                async move {
                    let result = self
                        .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
                        .await;
                    callback.set_progress(done.fetch_add(1, Ordering::SeqCst) + 1);
                    result
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            Some(first) => {
                let remaining = failures.count();
                if remaining > 0 {
                    tracing::warn!("{} further downloads failed", remaining);
                }
                Err(first)
            }
            None => Ok(()),
        }
    }

    /// Validate an existing file's SHA-1.
    pub async fn validate_sha1(path: &Path, expected: &str) -> LauncherResult<bool> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Ok(sha1_hex(&bytes).eq_ignore_ascii_case(expected))
    }
}

/// Write `bytes` to `dest`, creating parent directories.
///
/// The handle is dropped before returning so the file can be reopened right
/// away on Windows.
pub async fn write_file(dest: &Path, bytes: &[u8]) -> LauncherResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| LauncherError::io(dest, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| LauncherError::io(dest, e))?;
    file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
    Ok(())
}
