//! Mapping listing entry names onto mirror paths.
//!
//! A local path is a pure function of the directory it was found in and the
//! entry's href text, so re-running against an unchanged tree recomputes the
//! same paths. Names that could escape the directory are refused.

use std::path::{Path, PathBuf};

/// Local directory for a directory entry: the href with its trailing `/` removed.
pub(crate) fn child_dir(local_dir: &Path, name: &str) -> Option<PathBuf> {
    let trimmed = name.trim_end_matches('/');
    join_segments(local_dir, trimmed)
}

/// Local file path for a file entry.
pub(crate) fn file_path(local_dir: &Path, name: &str) -> Option<PathBuf> {
    if name.ends_with('/') {
        return None;
    }
    join_segments(local_dir, name)
}

fn join_segments(local_dir: &Path, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() || relative.starts_with('/') || relative.contains('\\') {
        return None;
    }

    let mut path = local_dir.to_path_buf();
    for segment in relative.split('/') {
        if matches!(segment, "" | "." | "..") {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}
