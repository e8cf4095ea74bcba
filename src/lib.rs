//! Mirror Core Library
//!
//! Recursively walks remote HTML directory listings and mirrors matching
//! files into a local tree with the same relative layout. Files already
//! present locally are never fetched again, so an interrupted run is
//! resumed by simply running it again.
//!
//! # Architecture
//!
//! - [`listing`] - Fetch a directory listing page and extract its entries
//! - [`download`] - HTTP client, retry policy and skip-if-present file fetches
//! - [`crawl`] - Bounded-concurrency traversal producing a [`CrawlReport`]
//! - [`inventory`] - Describe the files of a local mirror

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crawl;
pub mod download;
pub mod inventory;
pub mod listing;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use crawl::{CrawlError, CrawlOptions, CrawlReport, CrawlStats, Crawler, ErrorKind};
pub use download::{DownloadError, Downloader, FetchError, HttpClient, Outcome, RetryPolicy};
pub use inventory::{InventoryError, InventoryRecord, build_inventory};
pub use listing::{DirectoryLister, ListingEntry, ListingError};
