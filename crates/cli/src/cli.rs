//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// coride - shared-vehicle ridership sessions
#[derive(Parser, Debug)]
#[command(
    name = "coride",
    author,
    version,
    about = "Shared-vehicle ridership session runner",
    long_about = "Simulates a shared session in which agents negotiate authority over \n\
                  vehicles, take the driver or passenger seat, and drive them with a \n\
                  raycast-suspension vehicle model."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CORIDE_VERBOSE")]
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
        env = "CORIDE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted session
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
    #[arg(short, long, default_value = "coride.toml", env = "CORIDE_CONFIG")]
    pub config: PathBuf,

    /// Override `session.max_ticks`
    #[arg(long, env = "CORIDE_MAX_TICKS")]
    pub max_ticks: Option<u64>,

    /// Override `session.request_timeout_ms` (0 = wait forever)
    #[arg(long, env = "CORIDE_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Run ticks back-to-back instead of pacing them at `physics_hz`
    #[arg(long, env = "CORIDE_FAST")]
    pub fast: bool,

    /// Validate configuration and exit without running the session
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CORIDE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Holders never answer authority requests
    #[arg(long)]
    pub stall_authority_requests: bool,

    /// Holders never answer boarding requests
    #[arg(long)]
    pub stall_boarding_requests: bool,

    /// Passenger removals are lost before reaching the holder
    #[arg(long)]
    pub drop_passenger_removals: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "coride.toml", env = "CORIDE_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "coride.toml", env = "CORIDE_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show dynamics tuning per vehicle
    #[arg(long)]
    pub dynamics: bool,

    /// Show the input script
    #[arg(long)]
    pub script: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
