//! Retry with re-authentication.
//!
//! [`RetryCoordinator`] owns the live [`Session`] and wraps every API call:
//!
//! 1. Before every attempt but the first, wait `retry_delay` (cancellable).
//! 2. If the session is invalid, log in; a failed login uses up the attempt.
//! 3. Run the operation with the session.
//! 4. `AuthExpired` invalidates the session and moves on to the next attempt.
//! 5. Any other failure is returned immediately, success likewise.
//! 6. When the budget runs out, return [`WatchError::Exhausted`] wrapping
//!    the last error seen.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::auth::Authenticator;
use super::http::CallOutcome;
use super::session::{Credentials, Session};
use crate::error::{Result, WatchError};

/// Default number of attempts per operation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounded, fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per `run_with_retry` call (login attempts included). Zero is treated as one.
    pub max_retries: u32,
    /// Wait before each attempt after the first.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    const fn attempts(&self) -> u32 {
        if self.max_retries == 0 { 1 } else { self.max_retries }
    }
}

/// Single owner of the session; runs operations with re-login on expiry.
pub struct RetryCoordinator<A> {
    authenticator: A,
    credentials: Credentials,
    policy: RetryPolicy,
    session: Session,
    cancel: CancellationToken,
    logins: u64,
}

impl<A: Authenticator> RetryCoordinator<A> {
    /// Create a coordinator with no session; the first call logs in.
    #[must_use]
    pub fn new(authenticator: A, credentials: Credentials, policy: RetryPolicy) -> Self {
        Self {
            authenticator,
            credentials,
            policy,
            session: Session::invalid(),
            cancel: CancellationToken::new(),
            logins: 0,
        }
    }

    /// Make retry backoff waits end early with [`WatchError::Cancelled`]
    /// once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the cancellation token used during backoff waits.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Number of successful logins performed so far.
    #[must_use]
    pub const fn login_count(&self) -> u64 {
        self.logins
    }

    /// Perform one login and install the resulting session.
    ///
    /// On failure the current session is left invalid.
    ///
    /// # Errors
    ///
    /// Returns whatever the authenticator reports.
    pub async fn login(&mut self) -> Result<()> {
        self.session.invalidate();
        let session = self.authenticator.login(&self.credentials).await?;
        self.session = session;
        self.logins += 1;
        Ok(())
    }

    /// Run `operation` under the retry-with-reauthentication protocol.
    ///
    /// The operation receives a snapshot of the live session for each attempt.
    ///
    /// # Errors
    ///
    /// - the operation's own non-auth failure, returned on first sight
    /// - [`WatchError::Exhausted`] when every attempt ended in a login failure
    ///   or an expired session
    /// - [`WatchError::Cancelled`] if shutdown was requested during a backoff
    pub async fn run_with_retry<T, F, Fut>(&mut self, mut operation: F) -> Result<T>
    where
        F: FnMut(Session) -> Fut,
        Fut: Future<Output = CallOutcome<T>>,
    {
        let max_attempts = self.policy.attempts();
        let mut last_error: Option<WatchError> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.backoff().await?;
            }

            if !self.session.is_valid() {
                if let Err(e) = self.login().await {
                    warn!(attempt, max_attempts, error = %e, "Login attempt failed");
                    last_error = Some(e);
                    continue;
                }
                if attempt > 1 {
                    info!(attempt, "Re-authenticated");
                }
            }

            match operation(self.session.clone()).await {
                CallOutcome::Success(value) => return Ok(value),
                CallOutcome::AuthExpired => {
                    warn!(attempt, max_attempts, "Session expired, clearing cookies and retrying");
                    self.session.invalidate();
                    last_error = Some(WatchError::AuthExpired);
                }
                CallOutcome::Failure(e) => {
                    debug!(attempt, error = %e, "Operation failed, not retrying");
                    return Err(e);
                }
            }
        }

        Err(WatchError::Exhausted {
            attempts: max_attempts,
            last: Box::new(last_error.unwrap_or(WatchError::AuthExpired)),
        })
    }

    async fn backoff(&self) -> Result<()> {
        if self.policy.retry_delay.is_zero() {
            return if self.cancel.is_cancelled() {
                Err(WatchError::Cancelled)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            () = self.cancel.cancelled() => Err(WatchError::Cancelled),
            () = tokio::time::sleep(self.policy.retry_delay) => Ok(()),
        }
    }
}
