//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Transform Glimmer templates to TypeScript and report template problems.
#[derive(Debug, Parser)]
#[command(name = "glint-check-rs")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Working directory for the check
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Path to the environment configuration (defaults to glint.config.json
    /// or .glintrc.json in the workspace)
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Print the generated TypeScript for every transformed module to stderr
    #[arg(long = "emit-ts")]
    pub emit_ts: bool,

    /// Print the mapping trees of every transformed module to stderr
    #[arg(long = "debug-mapping")]
    pub debug_mapping: bool,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// JSON file of type-checker diagnostics against the generated code, to be
    /// mapped back to the original files
    #[arg(long)]
    pub diagnostics: Option<Utf8PathBuf>,

    /// Exit with error on warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,

    /// Log transformation details to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output
    Json,
    /// Machine-readable (one line per diagnostic)
    Machine,
}
