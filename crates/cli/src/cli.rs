//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::RouteId;
use std::path::PathBuf;

/// Relay - repository change-notification router
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    author,
    version,
    about = "Repository change-notification router",
    long_about = "Routes repository change notifications to indexing, forwarding,\n\
                  serialization and fixity sinks.\n\n\
                  Events are read as JSON lines (one transport message per line) from\n\
                  a file or stdin, classified, and fanned out with bounded redelivery."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route events read from a JSON-lines file or stdin
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Push update events for the given identifiers through one route
    Reindex(ReindexArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// JSON-lines input; `-` reads stdin
    #[arg(short, long, default_value = "-", env = "RELAY_INPUT")]
    pub input: String,

    /// Override the repository base URL from configuration
    #[arg(long, env = "RELAY_REPOSITORY_URL")]
    pub repository_url: Option<String>,

    /// Validate configuration and exit without routing
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between the source and the router
    #[arg(long, default_value = "100", env = "RELAY_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show destination bindings per route
    #[arg(long)]
    pub destinations: bool,
}

/// Arguments for the `reindex` command
#[derive(Parser, Debug)]
pub struct ReindexArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Route to reindex through (indexing, forwarding, serialization, fixity)
    #[arg(short, long)]
    pub route: RouteId,

    /// Override the repository base URL from configuration
    #[arg(long, env = "RELAY_REPOSITORY_URL")]
    pub repository_url: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Resource identifiers (e.g. /collection/item)
    #[arg(required = true)]
    pub identifiers: Vec<String>,
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
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
