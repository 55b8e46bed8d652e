//! Binary crate for the `srbwx` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting

use clap::Parser;
use srbwx_core::startup::Lifecycle;
use tracing_subscriber::EnvFilter;

mod cli;
mod render;

static LOGGING: Lifecycle = Lifecycle::new();

/// `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    LOGGING.run_once(|| {
        let default = if verbose { "warn,srbwx_core=debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    init_logging(cmd.verbose);
    cmd.run().await
}
