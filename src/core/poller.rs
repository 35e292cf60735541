//! Poll loop lifecycle.
//!
//! [`Poller`] logs in once on `start()` (a failure there is fatal), then runs
//! the scan on a fixed interval in a background task until `stop()` is
//! called. Cycle errors are logged and recorded in [`PollStats`], never
//! propagated out of the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::auth::Authenticator;
use super::scanner::{ErrorModelScanner, ScanReport};
use crate::error::{Result, WatchError};

/// Default time between two scan cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Lifecycle of a [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopped,
}

/// Counters tracked across poll cycles.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub deleted_total: u64,
    pub failed_deletions_total: u64,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_report: Option<ScanReport>,
}

impl PollStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the counters with the outcome of one cycle.
    pub fn update(&mut self, result: &Result<ScanReport>) {
        self.cycles += 1;
        self.last_scan_at = Some(Utc::now());
        match result {
            Ok(report) => {
                self.deleted_total += report.deleted.len() as u64;
                self.failed_deletions_total += report.failed_deletions.len() as u64;
                self.last_error = None;
                self.last_report = Some(report.clone());
            }
            Err(e) => {
                self.failed_cycles += 1;
                self.last_error = Some(e.to_string());
                // Keep last_report from the previous successful cycle.
            }
        }
    }
}

type LoopHandle<A> = JoinHandle<ErrorModelScanner<A>>;

/// Drives [`ErrorModelScanner::scan`] on a fixed interval.
pub struct Poller<A> {
    scanner: Option<ErrorModelScanner<A>>,
    interval: Duration,
    state: PollerState,
    cancel: CancellationToken,
    stats: Arc<Mutex<PollStats>>,
    task: Option<LoopHandle<A>>,
}

impl<A: Authenticator + 'static> Poller<A> {
    #[must_use]
    pub fn new(scanner: ErrorModelScanner<A>, interval: Duration) -> Self {
        Self {
            scanner: Some(scanner),
            interval,
            state: PollerState::Idle,
            cancel: CancellationToken::new(),
            stats: Arc::new(Mutex::new(PollStats::new())),
            task: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PollerState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == PollerState::Running
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Snapshot of the cycle counters.
    pub async fn stats(&self) -> PollStats {
        self.stats.lock().await.clone()
    }

    /// Log in, then spawn the poll loop.
    ///
    /// The first scan runs right away. Restarting after `stop()` is allowed.
    ///
    /// # Errors
    ///
    /// - [`WatchError::AlreadyRunning`] if the loop is running
    /// - the login error if the startup login fails
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(WatchError::AlreadyRunning);
        }
        let mut scanner = self.scanner.take().ok_or(WatchError::AlreadyRunning)?;

        info!("Logging in before starting the poll loop");
        if let Err(e) = scanner.login().await {
            error!(error = %e, "Startup login failed");
            self.scanner = Some(scanner);
            return Err(e);
        }

        // A fresh token per run so the poller can be restarted after stop().
        self.cancel = CancellationToken::new();
        scanner.set_cancellation(self.cancel.clone());

        let cancel = self.cancel.clone();
        let stats = Arc::clone(&self.stats);
        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            poll_loop(&mut scanner, interval, &cancel, &stats).await;
            scanner
        }));
        self.state = PollerState::Running;

        info!(interval_secs = interval.as_secs(), "Poller started");
        Ok(())
    }

    /// Cancel the loop and wait for the current step to finish.
    ///
    /// A deletion request already in flight is allowed to complete.
    ///
    /// # Errors
    ///
    /// - [`WatchError::NotRunning`] if the loop is not running
    /// - [`WatchError::Other`] if the loop task panicked
    pub async fn stop(&mut self) -> Result<PollStats> {
        if !self.is_running() {
            return Err(WatchError::NotRunning);
        }
        info!("Stopping poller");
        self.cancel.cancel();

        let handle = self.task.take().ok_or(WatchError::NotRunning)?;
        self.state = PollerState::Stopped;
        match handle.await {
            Ok(scanner) => self.scanner = Some(scanner),
            Err(e) => {
                warn!(error = %e, "Poll loop task ended abnormally");
                return Err(WatchError::Other(anyhow::anyhow!("poll loop task failed: {e}")));
            }
        }

        let stats = self.stats().await;
        info!(
            cycles = stats.cycles,
            failed_cycles = stats.failed_cycles,
            deleted = stats.deleted_total,
            "Poller stopped"
        );
        Ok(stats)
    }
}

impl<A> Drop for Poller<A> {
    fn drop(&mut self) {
        if self.task.is_some() && !self.cancel.is_cancelled() {
            warn!("Poller dropped while running; cancelling");
            self.cancel.cancel();
        }
    }
}

/// Scan, sleep, repeat until `cancel` fires.
///
/// Cancellation is checked before each scan, inside the scan between units
/// of work, and during the sleep.
pub async fn poll_loop<A: Authenticator>(
    scanner: &mut ErrorModelScanner<A>,
    interval: Duration,
    cancel: &CancellationToken,
    stats: &Mutex<PollStats>,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let result = scanner.scan().await;
        match &result {
            Ok(report) if report.cancelled => {
                debug!("Scan interrupted by shutdown");
                // Work done before the interruption still counts.
                stats.lock().await.update(&result);
                break;
            }
            Ok(_) => {}
            Err(WatchError::Cancelled) => {
                debug!("Scan interrupted by shutdown");
                break;
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Scan cycle failed, retrying next interval");
            }
        }
        stats.lock().await.update(&result);

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    debug!("Poll loop exited");
}
