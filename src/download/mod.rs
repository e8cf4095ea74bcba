//! Idempotent file downloads into the local mirror.
//!
//! A file counts as downloaded solely because an object exists at its
//! local path. [`Downloader::fetch_if_absent`] checks that through a
//! [`DownloadRegistry`] claim before touching the network, so concurrent
//! workers targeting one path produce a single write.
//!
//! # Example
//!
//! ```no_run
//! use mirror_core::download::{Downloader, HttpClient, Outcome, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(HttpClient::new(), RetryPolicy::default());
//! let outcome = downloader
//!     .fetch_if_absent(
//!         "https://example.com/2021/file_20210101_extent_v4.0.tif",
//!         Path::new("data/2021/file_20210101_extent_v4.0.tif"),
//!     )
//!     .await?;
//! assert!(matches!(outcome, Outcome::Downloaded { .. } | Outcome::Skipped));
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod registry;
mod retry;

use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tracing::{debug, info, instrument};

pub use client::HttpClient;
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::{DownloadError, FetchError};
pub use registry::{ClaimStatus, DownloadRegistry, FsRegistry};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error, with_retry,
};

use client::stream_to_file;
use registry::ClaimGuard;

/// Result of a single [`Downloader::fetch_if_absent`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The target already existed (or was being fetched); no network call was made.
    Skipped,
    /// The body was fetched and written in full.
    Downloaded {
        /// Bytes written to disk.
        bytes: u64,
    },
}

/// Fetch-and-write with existence-based deduplication.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: HttpClient,
    retry_policy: RetryPolicy,
    registry: Arc<dyn DownloadRegistry>,
}

impl Downloader {
    /// Creates a downloader backed by a fresh [`FsRegistry`].
    #[must_use]
    pub fn new(client: HttpClient, retry_policy: RetryPolicy) -> Self {
        Self::with_registry(client, retry_policy, Arc::new(FsRegistry::new()))
    }

    /// Creates a downloader with a caller-supplied registry.
    #[must_use]
    pub fn with_registry(
        client: HttpClient,
        retry_policy: RetryPolicy,
        registry: Arc<dyn DownloadRegistry>,
    ) -> Self {
        Self {
            client,
            retry_policy,
            registry,
        }
    }

    /// Downloads `file_url` to `local_path` unless something already exists there.
    ///
    /// Parent directories are created only once the remote responded with
    /// success, so failed fetches leave no empty directories behind.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Fetch`] on network failure or non-2xx status
    /// - [`DownloadError::Write`] when the directory or file cannot be written
    ///
    /// A partially written file is removed when streaming fails in-process.
    #[instrument(skip(self), fields(url = %file_url, path = %local_path.display()))]
    pub async fn fetch_if_absent(
        &self,
        file_url: &str,
        local_path: &Path,
    ) -> Result<Outcome, DownloadError> {
        match self.registry.claim(local_path).await {
            ClaimStatus::Present => {
                debug!("already present, skipping");
                return Ok(Outcome::Skipped);
            }
            ClaimStatus::InFlight => {
                debug!("claimed by another worker, skipping");
                return Ok(Outcome::Skipped);
            }
            ClaimStatus::Acquired => {}
        }

        let guard = ClaimGuard::new(self.registry.as_ref(), local_path);
        let bytes = self.fetch_to_path(file_url, local_path).await?;
        guard.commit();

        info!(bytes, "downloaded");
        Ok(Outcome::Downloaded { bytes })
    }

    async fn fetch_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = with_retry(&self.retry_policy, url, || self.client.get(url)).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::write(parent, e))?;
        }

        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::write(path, e))?;

        let result = stream_to_file(&mut file, response, url, path).await;
        if result.is_err() {
            drop(file);
            debug!(path = %path.display(), "removing partial file after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }
}
