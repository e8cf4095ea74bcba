//! Recursive mirroring of a remote directory tree.
//!
//! The crawler walks an explicit frontier of listing and file tasks with a
//! bounded pool of workers. Children of a listing are pushed in reverse so
//! that, with a concurrency of 1, the traversal is depth-first in listing
//! order.
//!
//! Failures never abort the crawl: a failed listing drops its subtree, a
//! failed file drops that file, and both are recorded in the
//! [`CrawlReport`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use mirror_core::crawl::{CrawlOptions, Crawler, DEFAULT_PATTERN};
//! use mirror_core::download::{Downloader, HttpClient, RetryPolicy};
//! use mirror_core::listing::DirectoryLister;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let mut crawler = Crawler::new(
//!     Arc::new(DirectoryLister::new(client.clone(), RetryPolicy::default())),
//!     Arc::new(Downloader::new(client, RetryPolicy::default())),
//!     CrawlOptions::new(DEFAULT_PATTERN)?,
//! );
//! let report = crawler
//!     .crawl("https://example.com/archive/", Path::new("data"))
//!     .await?;
//! println!("downloaded {}, skipped {}", report.downloaded, report.skipped);
//! # Ok(())
//! # }
//! ```

mod path;
mod report;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use regex::Regex;
use tokio::task::{Id as TaskId, JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::download::{DownloadError, Downloader, Outcome};
use crate::listing::{DirectoryLister, ListingEntry, ListingError};

pub use report::{CrawlFailure, CrawlReport, CrawlStats, ErrorKind, PlannedFetch};

/// Archive crawled when no root URL is given.
pub const DEFAULT_ROOT_URL: &str = "https://noaadata.apps.nsidc.org/NOAA/G02135/north/daily/geotiff/";

/// Default file-name pattern (daily sea ice extent rasters).
pub const DEFAULT_PATTERN: &str = r".*extent_v4\.0\.tif$";

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// How often the interrupt flag is polled while workers are busy.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Errors that prevent a crawl from starting.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Concurrency outside the allowed range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// The name pattern is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// The root URL is not an absolute URL.
    #[error("invalid root URL: {url}")]
    InvalidRootUrl {
        /// The rejected URL.
        url: String,
    },
}

/// Compiles `pattern` so that it must match an entire name.
///
/// # Errors
///
/// Returns [`CrawlError::InvalidPattern`] if the pattern does not compile.
pub fn compile_pattern(pattern: &str) -> Result<Regex, CrawlError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| CrawlError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Tunables for a single crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pattern: Regex,
    concurrency: usize,
    max_depth: Option<usize>,
    dry_run: bool,
}

impl CrawlOptions {
    /// Options with the given file-name pattern and default everything else.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, CrawlError> {
        Ok(Self {
            pattern: compile_pattern(pattern)?,
            concurrency: DEFAULT_CONCURRENCY,
            max_depth: None,
            dry_run: false,
        })
    }

    /// Sets the worker count.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidConcurrency`] outside 1..=100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, CrawlError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(CrawlError::InvalidConcurrency { value: concurrency });
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Limits how many directory levels below the root are listed.
    ///
    /// `Some(0)` lists only the root; `None` follows the remote tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// When set, matching files are reported instead of fetched.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Unit of work on the frontier.
#[derive(Debug)]
enum Task {
    List {
        url: Url,
        local_dir: PathBuf,
        depth: usize,
    },
    Fetch {
        url: Url,
        path: PathBuf,
    },
}

/// What a worker hands back to the scheduler.
enum TaskOutcome {
    Listed {
        url: Url,
        local_dir: PathBuf,
        depth: usize,
        result: Result<Vec<ListingEntry>, ListingError>,
    },
    Fetched {
        url: Url,
        path: PathBuf,
        result: Result<Outcome, DownloadError>,
    },
    Checked {
        url: Url,
        path: PathBuf,
        present: bool,
    },
}

/// Scheduler-local state; only the crawl loop touches it.
#[derive(Default)]
struct CrawlState {
    frontier: Vec<Task>,
    visited: HashSet<String>,
    /// URL and local target of every spawned task, until it is joined.
    running: HashMap<TaskId, (Url, PathBuf)>,
    failures: Vec<CrawlFailure>,
    planned: Vec<PlannedFetch>,
    planned_paths: HashSet<PathBuf>,
}

impl CrawlState {
    /// Marks a listing URL as visited; false if it already was.
    fn visit(&mut self, url: &Url) -> bool {
        let mut key = url.clone();
        key.set_fragment(None);
        self.visited.insert(key.into())
    }
}

/// Mirrors a remote directory tree into a local directory.
#[derive(Debug)]
pub struct Crawler {
    lister: Arc<DirectoryLister>,
    downloader: Arc<Downloader>,
    options: CrawlOptions,
    stats: Arc<CrawlStats>,
}

impl Crawler {
    #[must_use]
    pub fn new(
        lister: Arc<DirectoryLister>,
        downloader: Arc<Downloader>,
        options: CrawlOptions,
    ) -> Self {
        Self {
            lister,
            downloader,
            options,
            stats: Arc::new(CrawlStats::new()),
        }
    }

    /// Live counters for progress display.
    ///
    /// The same handle stays valid across crawls; each crawl restarts the
    /// counters at zero.
    #[must_use]
    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Crawls `root_url`, mirroring matching files under `output_root`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidRootUrl`] if `root_url` is not absolute.
    /// Listing and download failures are reported, not returned.
    pub async fn crawl(
        &mut self,
        root_url: &str,
        output_root: &Path,
    ) -> Result<CrawlReport, CrawlError> {
        self.crawl_interruptible(root_url, output_root, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Like [`crawl`](Self::crawl), but stops when `interrupted` becomes true.
    ///
    /// On interrupt no further tasks are started, in-flight tasks are
    /// aborted, and the report is marked interrupted. Files already written
    /// stay in place.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidRootUrl`] if `root_url` is not absolute.
    #[instrument(skip(self, interrupted), fields(root = %root_url, output = %output_root.display()))]
    pub async fn crawl_interruptible(
        &mut self,
        root_url: &str,
        output_root: &Path,
        interrupted: Arc<AtomicBool>,
    ) -> Result<CrawlReport, CrawlError> {
        let root = Url::parse(root_url).map_err(|_| CrawlError::InvalidRootUrl {
            url: root_url.to_string(),
        })?;
        if root.cannot_be_a_base() {
            return Err(CrawlError::InvalidRootUrl {
                url: root_url.to_string(),
            });
        }

        self.stats.reset();
        info!(
            concurrency = self.options.concurrency,
            max_depth = ?self.options.max_depth,
            dry_run = self.options.dry_run,
            pattern = %self.options.pattern,
            "starting crawl"
        );

        let mut state = CrawlState::default();
        state.visit(&root);
        state.frontier.push(Task::List {
            url: root,
            local_dir: output_root.to_path_buf(),
            depth: 0,
        });

        let mut workers: JoinSet<TaskOutcome> = JoinSet::new();
        let mut was_interrupted = false;

        loop {
            if interrupted.load(Ordering::SeqCst) {
                was_interrupted = true;
                break;
            }

            while workers.len() < self.options.concurrency {
                let Some(task) = state.frontier.pop() else {
                    break;
                };
                self.spawn_task(&mut workers, task, &mut state.running);
            }

            if workers.is_empty() {
                break;
            }

            // Race the next completion against the interrupt flag so Ctrl+C
            // does not wait for a slow download.
            let joined = tokio::select! {
                biased;
                () = wait_for_interrupt(&interrupted) => None,
                joined = workers.join_next_with_id() => joined,
            };

            match joined {
                Some(Ok((id, outcome))) => {
                    state.running.remove(&id);
                    self.absorb(outcome, &mut state);
                }
                Some(Err(e)) => self.absorb_join_error(e, &mut state),
                None if interrupted.load(Ordering::SeqCst) => {
                    was_interrupted = true;
                    break;
                }
                None => {}
            }
        }

        if was_interrupted {
            workers.abort_all();
            while workers.join_next().await.is_some() {}
            warn!(
                pending = state.frontier.len(),
                "crawl interrupted, remaining work abandoned"
            );
        }

        let report = CrawlReport::from_stats(
            &self.stats,
            state.failures,
            state.planned,
            was_interrupted,
        );
        info!(
            listed = report.listed,
            downloaded = report.downloaded,
            skipped = report.skipped,
            ignored = report.ignored,
            rejected = report.rejected,
            pruned = report.pruned,
            failed = report.failed(),
            bytes = report.bytes,
            "crawl complete"
        );
        Ok(report)
    }

    fn spawn_task(
        &self,
        workers: &mut JoinSet<TaskOutcome>,
        task: Task,
        running: &mut HashMap<TaskId, (Url, PathBuf)>,
    ) {
        let (handle, tracked) = match task {
            Task::List {
                url,
                local_dir,
                depth,
            } => {
                let tracked = (url.clone(), local_dir.clone());
                let lister = Arc::clone(&self.lister);
                let handle = workers.spawn(async move {
                    let result = lister.list(url.as_str()).await;
                    TaskOutcome::Listed {
                        url,
                        local_dir,
                        depth,
                        result,
                    }
                });
                (handle, tracked)
            }
            Task::Fetch { url, path } if self.options.dry_run => {
                let tracked = (url.clone(), path.clone());
                let handle = workers.spawn(async move {
                    let present = tokio::fs::metadata(&path).await.is_ok();
                    TaskOutcome::Checked { url, path, present }
                });
                (handle, tracked)
            }
            Task::Fetch { url, path } => {
                let tracked = (url.clone(), path.clone());
                let downloader = Arc::clone(&self.downloader);
                let handle = workers.spawn(async move {
                    let result = downloader.fetch_if_absent(url.as_str(), &path).await;
                    TaskOutcome::Fetched { url, path, result }
                });
                (handle, tracked)
            }
        };
        running.insert(handle.id(), tracked);
    }

    /// A task that panicked is a failure of its URL; a cancelled one is not.
    fn absorb_join_error(&self, error: JoinError, state: &mut CrawlState) {
        let Some((url, target)) = state.running.remove(&error.id()) else {
            warn!(error = %error, "untracked crawl task ended abnormally");
            return;
        };
        if error.is_panic() {
            warn!(url = %url, error = %error, "crawl task panicked");
            self.record_failure(
                state,
                url,
                ErrorKind::Panic,
                target,
                format!("task panic: {error}"),
            );
        } else {
            debug!(url = %url, "crawl task cancelled");
        }
    }

    fn absorb(&self, outcome: TaskOutcome, state: &mut CrawlState) {
        match outcome {
            TaskOutcome::Listed {
                url,
                local_dir,
                depth,
                result: Ok(entries),
            } => {
                self.stats.increment_listed();
                debug!(url = %url, entries = entries.len(), "listed");
                let children = self.schedule_children(entries, &local_dir, depth, state);
                // Reverse so the first listed child is popped first.
                state.frontier.extend(children.into_iter().rev());
            }
            TaskOutcome::Listed {
                url,
                local_dir,
                result: Err(e),
                ..
            } => {
                let kind = ErrorKind::of_listing(&e);
                warn!(url = %url, kind = %kind, error = %e, "listing failed, skipping subtree");
                self.record_failure(state, url, kind, local_dir, e.to_string());
            }
            TaskOutcome::Fetched {
                result: Ok(Outcome::Downloaded { bytes }),
                ..
            } => self.stats.record_download(bytes),
            TaskOutcome::Fetched {
                result: Ok(Outcome::Skipped),
                ..
            } => self.stats.increment_skipped(),
            TaskOutcome::Fetched {
                url,
                path,
                result: Err(e),
            } => {
                let kind = ErrorKind::of_download(&e);
                warn!(url = %url, kind = %kind, error = %e, "download failed");
                self.record_failure(state, url, kind, path, e.to_string());
            }
            TaskOutcome::Checked { present: true, .. } => self.stats.increment_skipped(),
            TaskOutcome::Checked { path, .. } if state.planned_paths.contains(&path) => {
                // A real run would find this path claimed and skip it.
                debug!(path = %path.display(), "already planned");
                self.stats.increment_skipped();
            }
            TaskOutcome::Checked { url, path, .. } => {
                state.planned_paths.insert(path.clone());
                info!(url = %url, path = %path.display(), "would download");
                state.planned.push(PlannedFetch {
                    url: url.into(),
                    path,
                });
            }
        }
    }

    /// Classifies the entries of one listing into follow-up tasks, in listing order.
    fn schedule_children(
        &self,
        entries: Vec<ListingEntry>,
        local_dir: &Path,
        depth: usize,
        state: &mut CrawlState,
    ) -> Vec<Task> {
        let mut children = Vec::new();

        for entry in entries {
            if entry.is_directory {
                let Some(child_dir) = path::child_dir(local_dir, &entry.name) else {
                    warn!(name = %entry.name, "rejecting directory name unsafe for local path");
                    self.stats.increment_rejected();
                    continue;
                };
                if self.options.max_depth.is_some_and(|max| depth >= max) {
                    debug!(url = %entry.resolved_url, "depth limit reached, not descending");
                    self.stats.increment_pruned();
                    continue;
                }
                if !state.visit(&entry.resolved_url) {
                    debug!(url = %entry.resolved_url, "listing already visited");
                    self.stats.increment_pruned();
                    continue;
                }
                children.push(Task::List {
                    url: entry.resolved_url,
                    local_dir: child_dir,
                    depth: depth + 1,
                });
            } else if self.options.pattern.is_match(&entry.name) {
                let Some(file_path) = path::file_path(local_dir, &entry.name) else {
                    warn!(name = %entry.name, "rejecting file name unsafe for local path");
                    self.stats.increment_rejected();
                    continue;
                };
                children.push(Task::Fetch {
                    url: entry.resolved_url,
                    path: file_path,
                });
            } else {
                debug!(name = %entry.name, "ignoring non-matching entry");
                self.stats.increment_ignored();
            }
        }

        children
    }

    fn record_failure(
        &self,
        state: &mut CrawlState,
        url: Url,
        kind: ErrorKind,
        target: PathBuf,
        message: String,
    ) {
        self.stats.increment_failed();
        state.failures.push(CrawlFailure {
            url: url.into(),
            kind,
            target,
            message,
        });
    }
}

async fn wait_for_interrupt(interrupted: &AtomicBool) {
    while !interrupted.load(Ordering::SeqCst) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::{ClaimStatus, DownloadRegistry, HttpClient, RetryPolicy};
    use async_trait::async_trait;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn crawler(options: CrawlOptions) -> Crawler {
        let client = HttpClient::new();
        Crawler::new(
            Arc::new(DirectoryLister::new(client.clone(), RetryPolicy::default())),
            Arc::new(Downloader::new(client, RetryPolicy::default())),
            options,
        )
    }

    fn listing(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|href| format!("<a href=\"{href}\">{href}</a>\n"))
            .collect();
        format!("<html><body><a href=\"../\">Parent Directory</a>\n{anchors}</body></html>")
    }

    async fn mount_listing(server: &MockServer, at: &str, hrefs: &[&str]) {
        Mock::given(method("GET"))
            .and(url_path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(hrefs)))
            .mount(server)
            .await;
    }

    async fn mount_file(server: &MockServer, at: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(url_path(at))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }

    #[test]
    fn test_pattern_must_match_whole_name() {
        let pattern = compile_pattern(DEFAULT_PATTERN).unwrap();
        assert!(pattern.is_match("N_20210101_extent_v4.0.tif"));
        assert!(!pattern.is_match("N_20210101_extent_v4.0.tif.xml"));

        let partial = compile_pattern("extent").unwrap();
        assert!(!partial.is_match("N_20210101_extent_v4.0.tif"));
        assert!(partial.is_match("extent"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let pattern = compile_pattern("a|b").unwrap();
        assert!(pattern.is_match("a"));
        assert!(!pattern.is_match("ab"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = CrawlOptions::new("(unclosed");
        assert!(matches!(result, Err(CrawlError::InvalidPattern { .. })));
    }

    #[test]
    fn test_concurrency_bounds() {
        let options = CrawlOptions::new(DEFAULT_PATTERN).unwrap();
        assert!(matches!(
            options.clone().with_concurrency(0),
            Err(CrawlError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            options.clone().with_concurrency(101),
            Err(CrawlError::InvalidConcurrency { value: 101 })
        ));
        assert_eq!(options.with_concurrency(100).unwrap().concurrency(), 100);
    }

    #[test]
    fn test_options_accessors_reflect_builder() {
        let options = CrawlOptions::new("a|b")
            .unwrap()
            .with_concurrency(3)
            .unwrap()
            .with_max_depth(Some(2))
            .with_dry_run(true);

        assert_eq!(options.pattern().as_str(), "^(?:a|b)$");
        assert_eq!(options.concurrency(), 3);
        assert_eq!(options.max_depth(), Some(2));
        assert!(options.dry_run());

        let crawler = crawler(options);
        assert_eq!(crawler.options().max_depth(), Some(2));
        assert!(crawler.options().dry_run());
    }

    #[tokio::test]
    async fn test_invalid_root_url_is_an_error() {
        let options = CrawlOptions::new(DEFAULT_PATTERN).unwrap();
        let result = crawler(options).crawl("not a url", Path::new("data")).await;
        assert!(matches!(result, Err(CrawlError::InvalidRootUrl { .. })));
    }

    #[tokio::test]
    async fn test_pattern_filtering_and_recursion() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        mount_listing(
            &server,
            "/root/",
            &["seaice_extent_v4.0.tif", "readme.txt", "subdir/"],
        )
        .await;
        mount_listing(&server, "/root/subdir/", &["deep_extent_v4.0.tif"]).await;
        mount_file(&server, "/root/seaice_extent_v4.0.tif", b"top").await;
        mount_file(&server, "/root/subdir/deep_extent_v4.0.tif", b"deep").await;

        let report = crawler(CrawlOptions::new(DEFAULT_PATTERN).unwrap())
            .crawl(&format!("{}/root/", server.uri()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.listed, 2);
        assert_eq!(report.downloaded, 2);
        assert_eq!(report.ignored, 1);
        assert!(report.is_clean());
        assert_eq!(
            std::fs::read(temp_dir.path().join("seaice_extent_v4.0.tif")).unwrap(),
            b"top"
        );
        assert_eq!(
            std::fs::read(temp_dir.path().join("subdir/deep_extent_v4.0.tif")).unwrap(),
            b"deep"
        );
        assert!(!temp_dir.path().join("readme.txt").exists());
    }

    #[tokio::test]
    async fn test_max_depth_prunes_deeper_listings() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        mount_listing(&server, "/root/", &["a_extent_v4.0.tif", "2021/"]).await;
        mount_file(&server, "/root/a_extent_v4.0.tif", b"a").await;
        Mock::given(method("GET"))
            .and(url_path("/root/2021/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[])))
            .expect(0)
            .mount(&server)
            .await;

        let options = CrawlOptions::new(DEFAULT_PATTERN)
            .unwrap()
            .with_max_depth(Some(0));
        let report = crawler(options)
            .crawl(&format!("{}/root/", server.uri()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.listed, 1);
        assert_eq!(report.pruned, 1);
        assert_eq!(report.downloaded, 1);
    }

    #[tokio::test]
    async fn test_repeated_directory_href_is_listed_once() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        // Fancy indexes link each directory twice (icon and name).
        mount_listing(&server, "/root/", &["2021/", "2021/"]).await;
        Mock::given(method("GET"))
            .and(url_path("/root/2021/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[])))
            .expect(1)
            .mount(&server)
            .await;

        let report = crawler(CrawlOptions::new(DEFAULT_PATTERN).unwrap())
            .crawl(&format!("{}/root/", server.uri()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.listed, 2);
        assert_eq!(report.pruned, 1);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_link_back_to_root_is_never_followed() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        let root = format!("{}/root/", server.uri());
        Mock::given(method("GET"))
            .and(url_path("/root/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["again/"])))
            .expect(1)
            .mount(&server)
            .await;
        mount_listing(&server, "/root/again/", &[root.as_str(), "/root/"]).await;

        let report = crawler(CrawlOptions::new(DEFAULT_PATTERN).unwrap())
            .crawl(&root, temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.listed, 2);
        assert_eq!(report.rejected, 2);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_writing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        mount_listing(&server, "/root/", &["2021/"]).await;
        mount_listing(
            &server,
            "/root/2021/",
            &["old_extent_v4.0.tif", "new_extent_v4.0.tif"],
        )
        .await;
        Mock::given(method("GET"))
            .and(url_path("/root/2021/new_extent_v4.0.tif"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        std::fs::create_dir_all(temp_dir.path().join("2021")).unwrap();
        std::fs::write(temp_dir.path().join("2021/old_extent_v4.0.tif"), b"x").unwrap();

        let options = CrawlOptions::new(DEFAULT_PATTERN)
            .unwrap()
            .with_dry_run(true);
        let report = crawler(options)
            .crawl(&format!("{}/root/", server.uri()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.planned.len(), 1);
        assert_eq!(
            report.planned[0].path,
            temp_dir.path().join("2021").join("new_extent_v4.0.tif")
        );
        assert!(!report.planned[0].path.exists());
    }

    #[tokio::test]
    async fn test_interrupt_before_start_reports_interrupted() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let report = crawler(CrawlOptions::new(DEFAULT_PATTERN).unwrap())
            .crawl_interruptible(
                &format!("{}/root/", server.uri()),
                temp_dir.path(),
                Arc::new(AtomicBool::new(true)),
            )
            .await
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.listed, 0);
    }

    #[tokio::test]
    async fn test_interrupt_aborts_in_flight_work() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(url_path("/root/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing(&[]))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let interrupted = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&interrupted);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.store(true, Ordering::SeqCst);
        });

        let started = std::time::Instant::now();
        let report = crawler(CrawlOptions::new(DEFAULT_PATTERN).unwrap())
            .crawl_interruptible(&format!("{}/root/", server.uri()), temp_dir.path(), interrupted)
            .await
            .unwrap();

        assert!(report.interrupted);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_second_crawl_on_same_crawler_reports_only_its_own_work() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        mount_listing(&server, "/root/", &["a_extent_v4.0.tif"]).await;
        Mock::given(method("GET"))
            .and(url_path("/root/a_extent_v4.0.tif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raster".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let mut crawler = crawler(CrawlOptions::new(DEFAULT_PATTERN).unwrap());
        let stats = crawler.stats();
        let root = format!("{}/root/", server.uri());

        let first = crawler.crawl(&root, temp_dir.path()).await.unwrap();
        assert_eq!(first.downloaded, 1);
        assert_eq!(first.bytes, 6);

        let second = crawler.crawl(&root, temp_dir.path()).await.unwrap();
        assert_eq!(second.listed, 1);
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.bytes, 0);
        assert_eq!(stats.skipped(), 1);
    }

    #[derive(Debug)]
    struct PanickingRegistry;

    #[async_trait]
    impl DownloadRegistry for PanickingRegistry {
        async fn claim(&self, _path: &Path) -> ClaimStatus {
            panic!("registry unavailable");
        }

        fn commit(&self, _path: &Path) {}

        fn release(&self, _path: &Path) {}
    }

    #[tokio::test]
    async fn test_panicking_download_task_is_a_failure() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        mount_listing(&server, "/root/", &["a_extent_v4.0.tif"]).await;

        let client = HttpClient::new();
        let mut crawler = Crawler::new(
            Arc::new(DirectoryLister::new(client.clone(), RetryPolicy::default())),
            Arc::new(Downloader::with_registry(
                client,
                RetryPolicy::default(),
                Arc::new(PanickingRegistry),
            )),
            CrawlOptions::new(DEFAULT_PATTERN).unwrap(),
        );

        let report = crawler
            .crawl(&format!("{}/root/", server.uri()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.listed, 1);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.kind, ErrorKind::Panic);
        assert!(failure.url.ends_with("/root/a_extent_v4.0.tif"));
        assert_eq!(failure.target, temp_dir.path().join("a_extent_v4.0.tif"));
        assert!(failure.message.contains("task panic"));
        assert_eq!(crawler.stats().failed(), 1);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_dry_run_plans_duplicate_link_once() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        mount_listing(&server, "/root/", &["a_extent_v4.0.tif", "a_extent_v4.0.tif"]).await;

        let options = CrawlOptions::new(DEFAULT_PATTERN)
            .unwrap()
            .with_dry_run(true);
        let report = crawler(options)
            .crawl(&format!("{}/root/", server.uri()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(report.planned.len(), 1);
        assert_eq!(report.skipped, 1);
        assert!(!temp_dir.path().join("a_extent_v4.0.tif").exists());
    }
}
