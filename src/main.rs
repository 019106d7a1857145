//! Binary entry point for llm-gateway.

#![allow(clippy::print_stderr)]

use std::io;

use anyhow::Context;
use clap::Parser;
use llm_gateway::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    if let Err(e) = execute(&cli, stdin.lock(), &mut stdout) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so replies on stdout stay clean. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "llm_gateway=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("Failed to create tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}
