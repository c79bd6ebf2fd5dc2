//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Capture Scheduler - deterministic sensor-capture scheduling over virtual time
#[derive(Parser, Debug)]
#[command(
    name = "capture-scheduler",
    author,
    version,
    about = "Deterministic sensor-capture scheduler",
    long_about = "Schedules periodic sensor captures on an exact virtual timeline.\n\n\
                  Loads a rig from configuration, runs the configured sequences tick by \n\
                  tick, and correlates delayed capture metrics with the frame that \n\
                  requested them."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CAPTURE_SCHEDULER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CAPTURE_SCHEDULER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured scenario
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "rig.toml", env = "CAPTURE_SCHEDULER_CONFIG")]
    pub config: PathBuf,

    /// Override the number of sequences
    #[arg(long, env = "CAPTURE_SCHEDULER_ITERATIONS")]
    pub iterations: Option<u32>,

    /// Override the number of ticks per sequence
    #[arg(long, env = "CAPTURE_SCHEDULER_TICKS")]
    pub ticks: Option<u64>,

    /// Log every tick at info level
    #[arg(long)]
    pub trace_ticks: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CAPTURE_SCHEDULER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "rig.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed sensor information
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
