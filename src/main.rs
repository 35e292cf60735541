//! gswatch - GPUStack watch
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use gswatch::cli::{Cli, Commands, check, run, scan};
use gswatch::core::logging;
use gswatch::storage::config::{Config, ResolvedConfig, resolve_log_level};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The config file may set the log level, so read it before logging starts.
    let config = Config::load_optional(cli.config.as_deref());

    let log_level = resolve_log_level(&cli, config.as_ref().ok());
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, cli.verbose);

    match dispatch(&cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), category = %e.category(), "{e}");
            eprintln!("Error [{}]: {e}", e.error_code());
            ExitCode::from(u8::from(e.exit_code()))
        }
    }
}

async fn dispatch(cli: &Cli, config: gswatch::Result<Config>) -> gswatch::Result<()> {
    let config = config?;
    let resolved = ResolvedConfig::resolve(cli, &config)?;
    resolved.log_summary();

    match cli.effective_command() {
        Commands::Run => run::execute(&resolved).await,
        Commands::Scan(args) => scan::execute(&args, &resolved).await,
        Commands::Check => check::execute(&resolved).await,
    }
}
