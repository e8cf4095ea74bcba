//! CLI entry point for the mirror tool.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::process::ExitCode;

use clap::Parser;

mod app;
mod app_config;
mod cli;
mod output;

use cli::Cli;

/// Process-level result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Everything succeeded.
    Success,
    /// Some work succeeded and some failed.
    Partial,
    /// Nothing useful happened, or the run was interrupted.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse before tracing is set up so --help and usage errors print cleanly.
    let cli = Cli::parse();

    match app::runtime::run(cli).await {
        Ok(outcome) => ExitCode::from(outcome.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
