//! HTTP client wrapper shared by the directory lister and the downloader.
//!
//! This module provides the `HttpClient` struct which issues GET requests
//! with proper timeout configuration and maps transport failures and
//! non-success statuses into [`FetchError`].

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::{DownloadError, FetchError};
use crate::user_agent;

/// HTTP client for listing and file requests.
///
/// This client is designed to be created once and reused for the whole
/// crawl, taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use mirror_core::download::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let body = client.get_bytes("https://example.com/archive/").await?;
/// println!("listing is {} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// See [`CONNECT_TIMEOUT_SECS`] and [`READ_TIMEOUT_SECS`].
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (TLS backend failure).
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self::try_new_with_timeouts(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Fallible variant of [`new_with_timeouts`](Self::new_with_timeouts).
    ///
    /// # Errors
    ///
    /// Returns the builder error if TLS backend or proxy initialization fails.
    pub fn try_new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Sends a GET request and checks the response status.
    ///
    /// The body is not read; callers stream or buffer it as needed.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns a non-2xx status
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "non-success status");
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

    /// Fetches a URL and buffers the whole body in memory.
    ///
    /// Intended for directory listings, which are small HTML documents.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get`](Self::get), plus body read failures.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(body.to_vec())
    }
}

/// Streams a response body to an open file, returning bytes written.
///
/// Kept separate so the caller can clean up the file on error.
pub(crate) async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::write(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::write(file_path, e))?;

    Ok(bytes_written)
}
