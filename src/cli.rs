//! CLI argument definitions using clap derive macros.
//!
//! Crawl options are `Option`s without clap defaults so that a value from
//! the config file can fill anything not given on the command line.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Mirror a remote HTTP directory listing into a local directory tree.
///
/// `mirror crawl` walks the listing recursively and downloads every file
/// whose name matches a pattern, skipping files already present locally.
/// `mirror inventory` describes what has been mirrored so far.
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recursively mirror matching files from a remote listing
    Crawl(CrawlArgs),
    /// List mirrored files with size and acquisition date
    Inventory(InventoryArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct CrawlArgs {
    /// Root listing URL (defaults to the NSIDC daily north GeoTIFF archive)
    pub root_url: Option<String>,

    /// Local mirror root [default: data]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Regex a file name must fully match to be downloaded
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Concurrent listing/download workers (1-100) [default: 4]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Retries for transient failures (0-10) [default: 0]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: Option<u8>,

    /// Directory levels below the root to descend into (0 = root only)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// List and filter only; print what would be downloaded
    #[arg(long)]
    pub dry_run: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InventoryArgs {
    /// Mirror directory to scan [default: data]
    pub dir: Option<PathBuf>,

    /// Regex a file name must fully match to be listed
    #[arg(short, long, default_value = mirror_core::inventory::DEFAULT_INVENTORY_PATTERN)]
    pub pattern: String,

    /// Print records as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
