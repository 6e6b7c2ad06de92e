//! CLI parse: clap types for Augur. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Augur CLI - staged news forecasting
#[derive(Parser, Debug)]
#[command(name = "augur")]
#[command(about = "Turn news topics into chained forecasts and store them as records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ and relative store paths resolve against it)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline once
    Run {
        /// Topic to forecast, terms separated by commas (repeatable; replaces configured topics)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Maximum stages per chain
        #[arg(long)]
        stop_count: Option<usize>,

        /// Read top headlines instead of the full archive
        #[arg(long)]
        headlines: bool,

        /// Abandon chains still running after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
}
