//! Claim bookkeeping that makes "already downloaded?" atomic under concurrency.
//!
//! The filesystem stays the source of truth for completed downloads: a path
//! with an existing object is [`ClaimStatus::Present`]. On top of that the
//! registry tracks which paths are currently being fetched in this process,
//! so two workers racing on the same path cannot both pass the existence
//! check and both write the file.
//!
//! Lifecycle of a claim: `claim`, then fetch, then `commit` on success or
//! `release` on failure. Either way the path is free to claim again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::trace;

/// Result of trying to claim a local path for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// The caller now owns the path and must `commit` or `release` it.
    Acquired,
    /// A filesystem object exists at the path.
    Present,
    /// Another in-flight download holds the claim.
    InFlight,
}

/// Registry of claimed download targets.
#[async_trait]
pub trait DownloadRegistry: Send + Sync + std::fmt::Debug {
    /// Attempts to claim `path`. Must not perform network I/O.
    async fn claim(&self, path: &Path) -> ClaimStatus;

    /// Ends a claim whose file was fully written.
    fn commit(&self, path: &Path);

    /// Ends a claim whose download failed or was abandoned.
    fn release(&self, path: &Path);
}

/// Registry backed by filesystem existence plus an in-memory claim set.
///
/// Nothing is remembered about finished downloads: once a claim ends, the
/// next `claim` asks the filesystem again, so a deleted file is fetched
/// anew.
#[derive(Debug, Default)]
pub struct FsRegistry {
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl FsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DownloadRegistry for FsRegistry {
    async fn claim(&self, path: &Path) -> ClaimStatus {
        if !self.lock().insert(path.to_path_buf()) {
            return ClaimStatus::InFlight;
        }

        // Checked while holding the claim, so no other worker can be
        // writing the path. Existence only: size, mtime and content are
        // never consulted.
        if tokio::fs::metadata(path).await.is_ok() {
            self.lock().remove(path);
            return ClaimStatus::Present;
        }

        trace!(path = %path.display(), "claimed");
        ClaimStatus::Acquired
    }

    fn commit(&self, path: &Path) {
        self.lock().remove(path);
        trace!(path = %path.display(), "committed");
    }

    fn release(&self, path: &Path) {
        self.lock().remove(path);
    }
}

/// Releases a claim on drop unless it was committed.
///
/// Dropping happens on error returns and when a download task is aborted.
pub(crate) struct ClaimGuard<'a> {
    registry: &'a dyn DownloadRegistry,
    path: &'a Path,
    committed: bool,
}

impl<'a> ClaimGuard<'a> {
    pub(crate) fn new(registry: &'a dyn DownloadRegistry, path: &'a Path) -> Self {
        Self {
            registry,
            path,
            committed: false,
        }
    }

    pub(crate) fn commit(mut self) {
        self.registry.commit(self.path);
        self.committed = true;
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.release(self.path);
        }
    }
}
