//! Crawl counters and the final report.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::download::DownloadError;
use crate::listing::ListingError;

/// Live counters updated by crawl workers.
///
/// Shared through an `Arc` so a progress display can poll them while the
/// crawl runs.
#[derive(Debug, Default)]
pub struct CrawlStats {
    listed: AtomicUsize,
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    ignored: AtomicUsize,
    rejected: AtomicUsize,
    pruned: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicU64,
}

impl CrawlStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories listed successfully.
    #[must_use]
    pub fn listed(&self) -> usize {
        self.listed.load(Ordering::SeqCst)
    }

    /// Files fetched and written.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Matching files that already existed locally.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Files whose name did not match the pattern.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.ignored.load(Ordering::SeqCst)
    }

    /// Entries whose name cannot be mapped to a safe local path.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Directories not descended into (depth limit or already visited).
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.pruned.load(Ordering::SeqCst)
    }

    /// Listings and files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Total bytes written this run.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    /// Zeroes every counter.
    pub(crate) fn reset(&self) {
        for counter in [
            &self.listed,
            &self.downloaded,
            &self.skipped,
            &self.ignored,
            &self.rejected,
            &self.pruned,
            &self.failed,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.bytes.store(0, Ordering::SeqCst);
    }

    pub(crate) fn increment_listed(&self) {
        self.listed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_download(&self, bytes: u64) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Category of a crawl failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure, timeout, invalid URL or non-2xx status.
    Fetch,
    /// A listing body that is not HTML.
    Parse,
    /// A local directory or file could not be written.
    Write,
    /// The task handling the URL panicked.
    Panic,
}

impl ErrorKind {
    pub(crate) fn of_listing(error: &ListingError) -> Self {
        match error {
            ListingError::Fetch(_) => Self::Fetch,
            ListingError::Parse { .. } => Self::Parse,
        }
    }

    pub(crate) fn of_download(error: &DownloadError) -> Self {
        match error {
            DownloadError::Fetch(_) => Self::Fetch,
            DownloadError::Write { .. } => Self::Write,
        }
    }

    /// Lowercase label used in summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Write => "write",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed listing (the whole subtree) or one failed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    /// Remote URL that failed.
    pub url: String,
    /// Failure category.
    pub kind: ErrorKind,
    /// Local directory (listings) or file (downloads) the URL maps to.
    pub target: PathBuf,
    /// Rendered error.
    pub message: String,
}

/// A file a dry run would have fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFetch {
    /// Remote file URL.
    pub url: String,
    /// Mirror path the file would be written to.
    pub path: PathBuf,
}

/// Outcome of a whole crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub listed: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub ignored: usize,
    pub rejected: usize,
    pub pruned: usize,
    /// Bytes written by this run.
    pub bytes: u64,
    /// Failures in the order they were observed.
    pub failures: Vec<CrawlFailure>,
    /// Files a dry run would fetch; always empty otherwise.
    pub planned: Vec<PlannedFetch>,
    /// True when the run was cut short by an interrupt.
    pub interrupted: bool,
}

impl CrawlReport {
    pub(crate) fn from_stats(
        stats: &CrawlStats,
        failures: Vec<CrawlFailure>,
        planned: Vec<PlannedFetch>,
        interrupted: bool,
    ) -> Self {
        Self {
            listed: stats.listed(),
            downloaded: stats.downloaded(),
            skipped: stats.skipped(),
            ignored: stats.ignored(),
            rejected: stats.rejected(),
            pruned: stats.pruned(),
            bytes: stats.bytes(),
            failures,
            planned,
            interrupted,
        }
    }

    /// Number of failed listings and files.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when nothing failed and the run completed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }
}
