use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use mirror_core::crawl::{CrawlOptions, Crawler, compile_pattern};
use mirror_core::download::{Downloader, HttpClient, RetryPolicy};
use mirror_core::inventory::build_inventory;
use mirror_core::listing::DirectoryLister;
use tracing::{debug, info, warn};

use crate::app::{config_runtime, exit_handler, progress_manager, terminal};
use crate::app_config::{self, FileConfig};
use crate::cli::{Cli, Command, CrawlArgs, InventoryArgs};
use crate::{ProcessExit, output};

pub(crate) async fn run(cli: Cli) -> Result<ProcessExit> {
    let config_path = match &cli.command {
        Command::Crawl(args) => args.config.as_deref(),
        Command::Inventory(args) => args.config.as_deref(),
    };
    let loaded = app_config::load_config(config_path)?;
    let file_config = loaded.config.as_ref();
    let config_verbosity = file_config.and_then(|cfg| cfg.verbosity);

    let default_level =
        config_runtime::resolve_default_log_level(cli.verbose, cli.quiet, config_verbosity);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(cli.verbose, cli.quiet);
    terminal::init_tracing(
        default_level,
        force_cli_log_level,
        terminal::is_no_color_requested(&cli),
    );

    match &loaded.path {
        Some(path) if file_config.is_some() => debug!(path = %path.display(), "config loaded"),
        Some(path) => debug!(path = %path.display(), "no config file, using defaults"),
        None => debug!("no config location known, using defaults"),
    }
    if let Some(verbosity) = config_verbosity {
        debug!(verbosity = verbosity.as_str(), "verbosity from config");
    }

    let quiet = config_runtime::effective_quiet(cli.verbose, cli.quiet, config_verbosity);
    match &cli.command {
        Command::Crawl(args) => run_crawl(args, file_config, quiet).await,
        Command::Inventory(args) => run_inventory(args, file_config),
    }
}

async fn run_crawl(
    args: &CrawlArgs,
    file_config: Option<&FileConfig>,
    quiet: bool,
) -> Result<ProcessExit> {
    let settings = config_runtime::resolve_crawl_settings(args, file_config);
    debug!(?settings, "effective crawl settings");

    let options = CrawlOptions::new(&settings.pattern)?
        .with_concurrency(settings.concurrency)?
        .with_max_depth(settings.max_depth)
        .with_dry_run(settings.dry_run);

    let client =
        HttpClient::try_new_with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs)
            .context("Failed to build HTTP client")?;
    let retry_policy = RetryPolicy::with_max_attempts(settings.max_attempts());
    let mut crawler = Crawler::new(
        Arc::new(DirectoryLister::new(client.clone(), retry_policy.clone())),
        Arc::new(Downloader::new(client, retry_policy)),
        options,
    );
    let options = crawler.options();
    debug!(
        pattern = %options.pattern(),
        concurrency = options.concurrency(),
        max_depth = ?options.max_depth(),
        dry_run = options.dry_run(),
        "crawler configured"
    );
    let dry_run = options.dry_run();

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_spinner, crawler.stats());

    let result = crawler
        .crawl_interruptible(&settings.root_url, &settings.output_dir, interrupted)
        .await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let report = result?;
    output::print_crawl_summary(&report, &settings.output_dir, dry_run);

    if report.interrupted {
        warn!(
            downloaded = report.downloaded,
            "Interrupted. Run again to resume."
        );
    }

    Ok(exit_handler::crawl_exit_outcome(&report))
}

fn run_inventory(args: &InventoryArgs, file_config: Option<&FileConfig>) -> Result<ProcessExit> {
    let dir = config_runtime::resolve_inventory_dir(args, file_config);
    let pattern = compile_pattern(&args.pattern)?;
    let records = build_inventory(&dir, &pattern)?;
    info!(dir = %dir.display(), records = records.len(), "inventory complete");

    output::print_inventory(&records, args.json)?;
    Ok(ProcessExit::Success)
}
