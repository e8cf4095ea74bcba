//! Inventory of the local mirror.
//!
//! Walks a mirror directory and describes every file whose name matches a
//! pattern, with the acquisition date encoded in names like
//! `N_20210101_extent_v4.0.tif`. Downstream analysis consumes these rows.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default inventory pattern: any GeoTIFF.
pub const DEFAULT_INVENTORY_PATTERN: &str = r".*\.tif$";

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d{8})_").unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// One mirrored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRecord {
    pub filename: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
    /// Date from the first `_YYYYMMDD_` group of the name, if valid.
    pub date: Option<NaiveDate>,
}

/// Errors raised while building an inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The mirror root does not exist or is not a directory.
    #[error("mirror directory not found: {path}")]
    MissingRoot {
        /// The directory that was requested.
        path: PathBuf,
    },
}

/// Extracts the date encoded in a file name.
///
/// Only the first `_YYYYMMDD_` group is considered; a group that is not a
/// calendar date (e.g. `_20211340_`) yields `None`.
#[must_use]
pub fn filename_date(filename: &str) -> Option<NaiveDate> {
    let digits = DATE_RE.captures(filename)?.get(1)?.as_str();
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Lists files under `root` whose name fully matches `pattern`, sorted by path.
///
/// Entries that cannot be read are logged and skipped.
///
/// # Errors
///
/// Returns [`InventoryError::MissingRoot`] if `root` is not a directory.
pub fn build_inventory(root: &Path, pattern: &Regex) -> Result<Vec<InventoryRecord>, InventoryError> {
    if !root.is_dir() {
        return Err(InventoryError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    let mut records: Vec<InventoryRecord> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable mirror entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !pattern.is_match(&filename) {
                return None;
            }
            let size_bytes = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "cannot stat mirror file");
                    return None;
                }
            };
            Some(InventoryRecord {
                date: filename_date(&filename),
                filename,
                local_path: entry.into_path(),
                size_bytes,
            })
        })
        .collect();

    records.sort_by(|a, b| a.local_path.cmp(&b.local_path));
    debug!(root = %root.display(), records = records.len(), "inventory built");
    Ok(records)
}
