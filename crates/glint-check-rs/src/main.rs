//! glint-check-rs: Glimmer template transformation and diagnostic mapping.

mod cli;
mod config;
mod fs;
mod orchestrator;
mod output;

use clap::Parser;
use cli::Args;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    let summary = orchestrator::run(args).into_diagnostic()?;
    if summary.failed() {
        std::process::exit(1);
    }
    Ok(())
}
