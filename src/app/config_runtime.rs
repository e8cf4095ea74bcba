//! Merges command-line values, config file values and built-in defaults.
//!
//! Precedence for every setting: command line > config file > default.

use std::path::PathBuf;

use mirror_core::crawl::{DEFAULT_CONCURRENCY, DEFAULT_PATTERN, DEFAULT_ROOT_URL};
use mirror_core::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::{CrawlArgs, InventoryArgs};

/// Mirror root when neither the command line nor the config names one.
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "data";

/// Effective crawl configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CrawlSettings {
    pub(crate) root_url: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) pattern: String,
    pub(crate) concurrency: usize,
    pub(crate) max_retries: u8,
    pub(crate) max_depth: Option<usize>,
    pub(crate) dry_run: bool,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
}

impl CrawlSettings {
    /// Attempts per request: the first try plus retries.
    pub(crate) fn max_attempts(&self) -> u32 {
        u32::from(self.max_retries) + 1
    }
}

pub(crate) fn resolve_crawl_settings(
    args: &CrawlArgs,
    file_config: Option<&FileConfig>,
) -> CrawlSettings {
    let file = file_config.cloned().unwrap_or_default();

    CrawlSettings {
        root_url: args
            .root_url
            .clone()
            .or(file.root_url)
            .unwrap_or_else(|| DEFAULT_ROOT_URL.to_string()),
        output_dir: args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        pattern: args
            .pattern
            .clone()
            .or(file.pattern)
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
        concurrency: args
            .concurrency
            .or(file.concurrency)
            .map_or(DEFAULT_CONCURRENCY, usize::from),
        max_retries: args.max_retries.or(file.max_retries).unwrap_or(0),
        max_depth: args.max_depth.or(file.max_depth),
        dry_run: args.dry_run,
        connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    }
}

pub(crate) fn resolve_inventory_dir(args: &InventoryArgs, file_config: Option<&FileConfig>) -> PathBuf {
    args.dir
        .clone()
        .or_else(|| file_config.and_then(|cfg| cfg.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Level used when neither the flags nor `RUST_LOG` decide.
pub(crate) fn resolve_default_log_level(
    verbose: u8,
    quiet: bool,
    config_verbosity: Option<VerbositySetting>,
) -> &'static str {
    if quiet {
        return "error";
    }
    if verbose > 0 {
        return if verbose == 1 { "debug" } else { "trace" };
    }
    match config_verbosity {
        None | Some(VerbositySetting::Default) => "info",
        Some(VerbositySetting::Verbose) => "debug",
        Some(VerbositySetting::Quiet) => "error",
        Some(VerbositySetting::Debug) => "trace",
    }
}

/// Explicit `-v`/`-q` beat `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(verbose: u8, quiet: bool) -> bool {
    verbose > 0 || quiet
}

/// Quiet mode from the flag, or from the config when no verbosity flag is given.
pub(crate) fn effective_quiet(
    verbose: u8,
    quiet: bool,
    config_verbosity: Option<VerbositySetting>,
) -> bool {
    quiet || (verbose == 0 && config_verbosity == Some(VerbositySetting::Quiet))
}
