//! Remote directory listings.
//!
//! A listing is an HTML page whose anchors name the children of one remote
//! directory. [`DirectoryLister::list`] fetches such a page and returns its
//! entries in document order, minus the first anchor (the parent link).

mod parse;

use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::download::{FetchError, HttpClient, RetryPolicy, with_retry};

/// One child of a remote directory, as advertised by its listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// The raw `href` text (entity-decoded); empty when the anchor had none.
    pub name: String,
    /// True iff `name` ends with `/`.
    pub is_directory: bool,
    /// `name` resolved against the listing URL.
    pub resolved_url: Url,
}

/// Errors raised while listing a remote directory.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The listing could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The listing body was fetched but is not a usable HTML document.
    #[error("cannot parse listing at {url}: {reason}")]
    Parse {
        /// Listing URL.
        url: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl ListingError {
    /// Creates a parse error for `url`.
    pub fn parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// URL of the listing that failed.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch(e) => e.url(),
            Self::Parse { url, .. } => url,
        }
    }
}

/// Fetches and parses remote directory listings.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    client: HttpClient,
    retry_policy: RetryPolicy,
}

impl DirectoryLister {
    /// Creates a lister sharing `client`'s connection pool.
    #[must_use]
    pub fn new(client: HttpClient, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    /// Lists the children of `directory_url`.
    ///
    /// Relative hrefs are resolved against `directory_url` as given, not
    /// against any redirect target. Anchors whose href cannot be resolved are
    /// dropped with a warning.
    ///
    /// # Errors
    ///
    /// - [`ListingError::Fetch`] on invalid URL, network failure or non-2xx status
    /// - [`ListingError::Parse`] when the body is not UTF-8 HTML
    #[instrument(skip(self), fields(url = %directory_url))]
    pub async fn list(&self, directory_url: &str) -> Result<Vec<ListingEntry>, ListingError> {
        let base = Url::parse(directory_url).map_err(|_| FetchError::invalid_url(directory_url))?;
        if !base.path().ends_with('/') {
            warn!("listing URL has no trailing '/', relative links resolve against its parent");
        }

        let body = with_retry(&self.retry_policy, directory_url, || {
            self.client.get_bytes(directory_url)
        })
        .await?;

        let entries = parse::parse_listing(&base, &body)
            .map_err(|failure| ListingError::parse(directory_url, failure.reason()))?;

        debug!(entries = entries.len(), "listing parsed");
        Ok(entries)
    }
}
