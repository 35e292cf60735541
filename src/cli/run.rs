//! `run` command: poll until a termination signal arrives.

use tracing::{info, warn};

use crate::cli::scan::build_scanner;
use crate::core::poller::Poller;
use crate::core::scanner::ScanOptions;
use crate::error::Result;
use crate::storage::config::ResolvedConfig;

/// Execute the run command.
///
/// # Errors
///
/// Returns the startup login error; once polling has started, only a failure
/// to shut the loop down is reported.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    let scanner = build_scanner(config, ScanOptions::default())?;
    let mut poller = Poller::new(scanner, config.interval);

    // Listen before the first scan so an early SIGTERM still stops cleanly.
    let shutdown = tokio::spawn(shutdown_signal());
    if let Err(e) = poller.start().await {
        shutdown.abort();
        return Err(e);
    }
    if let Err(e) = shutdown.await {
        warn!(error = %e, "Shutdown listener ended abnormally");
    }

    let stats = poller.stop().await?;
    info!(
        cycles = stats.cycles,
        failed_cycles = stats.failed_cycles,
        deleted = stats.deleted_total,
        failed_deletions = stats.failed_deletions_total,
        last_error = stats.last_error.as_deref().unwrap_or("none"),
        "Shutdown complete"
    );
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
