//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Watch a GPUStack server and delete model instances stuck in the error state.
#[derive(Parser, Debug, Default)]
#[command(name = "gswatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Connection ===
    /// Path to config.toml
    #[arg(long, value_name = "PATH", env = "GSWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the API server [default: http://127.0.0.1]
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,

    /// Login username [default: admin]
    #[arg(long, value_name = "NAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, value_name = "SECRET", global = true)]
    pub password: Option<String>,

    // === Polling ===
    /// Seconds between scan cycles [default: 30]
    #[arg(long, value_name = "SECONDS", global = true)]
    pub interval: Option<u64>,

    /// Per-request timeout in seconds [default: 10]
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Attempts per API call before giving up [default: 3]
    #[arg(long, value_name = "N", global = true)]
    pub max_retries: Option<u32>,

    /// Seconds to wait between attempts [default: 5]
    #[arg(long, value_name = "SECONDS", global = true)]
    pub retry_delay: Option<u64>,

    /// POST a JSON event to this URL after each deletion attempt
    #[arg(long, value_name = "URL", global = true)]
    pub notify_url: Option<String>,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// The command to run; `run` when none is given.
    #[must_use]
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll forever, deleting error instances (default command)
    Run,

    /// Run a single scan cycle and print what it did
    Scan(ScanArgs),

    /// Verify that the credentials are accepted
    Check,
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanArgs {
    /// List error instances without deleting them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
