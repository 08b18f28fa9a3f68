#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Binary entrypoint: parses the command line and runs the reclaimer until signalled.

use std::path::PathBuf;

use clap::Parser;
use reclaimer_app::{AppResult, run_app};

/// Delete stored files for pending records and mark them processed.
#[derive(Debug, Parser)]
#[command(name = "reclaimer", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', env = "RECLAIMER_CONFIG")]
    config: Option<PathBuf>,
}

/// Bootstraps the reclaimer and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    run_app(cli.config).await
}
