//! `scan` command: one login, one scan cycle, a printed report.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::ScanArgs;
use crate::core::auth::HttpAuthenticator;
use crate::core::http::{HttpExecutor, build_client};
use crate::core::notify::WebhookNotifier;
use crate::core::retry::RetryCoordinator;
use crate::core::scanner::{ErrorModelScanner, ScanOptions, ScanReport};
use crate::error::{Result, WatchError};
use crate::storage::config::ResolvedConfig;

/// Wire the HTTP client, authenticator, retry layer, and notifier together.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn build_scanner(
    config: &ResolvedConfig,
    options: ScanOptions,
) -> Result<ErrorModelScanner<HttpAuthenticator>> {
    let client = build_client(config.request_timeout)?;
    let executor = HttpExecutor::new(client.clone(), &config.base_url, config.request_timeout);
    let authenticator = HttpAuthenticator::new(executor.clone());
    let coordinator =
        RetryCoordinator::new(authenticator, config.credentials.clone(), config.retry);

    let mut scanner = ErrorModelScanner::new(coordinator, executor).with_options(options);
    if let Some(url) = &config.notify_url {
        info!(url = %url, "Deletion events will be posted to webhook");
        scanner = scanner.with_notifier(Arc::new(WebhookNotifier::new(client, url.clone())));
    }
    Ok(scanner)
}

/// Execute the scan command.
///
/// # Errors
///
/// Returns the login error, or the model listing error that ended the cycle.
pub async fn execute(args: &ScanArgs, config: &ResolvedConfig) -> Result<()> {
    let mut scanner = build_scanner(
        config,
        ScanOptions {
            dry_run: args.dry_run,
        },
    )?;

    let cancel = CancellationToken::new();
    scanner.set_cancellation(cancel.clone());
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing the current request");
                cancel.cancel();
            }
        }
    });

    let result = match scanner.login().await {
        Ok(()) => scanner.scan().await,
        Err(e) => Err(e),
    };
    ctrl_c.abort();
    let report = match result {
        Err(WatchError::Cancelled) => {
            info!("Scan interrupted before any work was done");
            return Ok(());
        }
        other => other?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_human(&report, args.dry_run));
    }
    Ok(())
}

/// Plain-text summary of a scan report.
#[must_use]
pub fn render_human(report: &ScanReport, dry_run: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Scanned {} model(s), {} instance(s)",
        report.models, report.instances
    );

    if report.error_instances.is_empty() {
        let _ = writeln!(out, "No instances in error state");
    } else {
        let _ = writeln!(
            out,
            "Error instances: {}",
            join_ids(&report.error_instances)
        );
    }
    if dry_run && !report.skipped.is_empty() {
        let _ = writeln!(out, "Would delete: {} (dry run)", join_ids(&report.skipped));
    }
    if !report.deleted.is_empty() {
        let _ = writeln!(out, "Deleted: {}", join_ids(&report.deleted));
    }
    for failure in &report.failed_deletions {
        let _ = writeln!(
            out,
            "Failed to delete instance {} (model {}): {}",
            failure.instance_id, failure.model_id, failure.error
        );
    }
    for failure in &report.model_failures {
        let _ = writeln!(
            out,
            "Could not list instances of model {}: {}",
            failure.model_id, failure.error
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "Scan interrupted before completion");
    }
    out
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
