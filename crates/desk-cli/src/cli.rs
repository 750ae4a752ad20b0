//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Desk console CLI - browse fleet resources and follow live device logs.
#[derive(Parser, Debug, Clone)]
#[command(name = "desk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Console API server URL (overrides the config file).
    #[arg(short, long, env = "DESK_SERVER")]
    pub server: Option<String>,

    /// API token (overrides the config file).
    #[arg(short, long, env = "DESK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to a TOML config file.
    #[arg(short, long, env = "DESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Diagnostic log format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Diagnostic log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List one page of a resource collection.
    List(ListArgs),

    /// Follow a live frame or event stream.
    Tail {
        /// Stream to follow.
        #[command(subcommand)]
        stream: TailCommands,
    },
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Resource collection, e.g. `devices`, `gateways`, `applications`.
    pub resource: String,

    /// Page to fetch (starting at 1).
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page (defaults to the configured page size).
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Sort key, forwarded to the server as-is.
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Filters (KEY=VALUE). Values that parse as JSON are sent as JSON.
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

/// Options shared by every tail subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct TailOptions {
    /// Stop after this many entries.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Tail subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TailCommands {
    /// Raw frames received and sent by a gateway.
    GatewayFrames {
        /// Gateway id.
        gateway_id: String,
        /// Shared options.
        #[command(flatten)]
        options: TailOptions,
    },

    /// Raw frames of one device.
    DeviceFrames {
        /// Device EUI.
        dev_eui: String,
        /// Shared options.
        #[command(flatten)]
        options: TailOptions,
    },

    /// Decoded events of one device.
    DeviceEvents {
        /// Device EUI.
        dev_eui: String,
        /// Shared options.
        #[command(flatten)]
        options: TailOptions,
    },
}

impl TailCommands {
    /// Shared options of the selected stream.
    #[must_use]
    pub const fn options(&self) -> &TailOptions {
        match self {
            Self::GatewayFrames { options, .. }
            | Self::DeviceFrames { options, .. }
            | Self::DeviceEvents { options, .. } => options,
        }
    }
}
