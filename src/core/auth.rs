//! Login exchange against `POST /auth/login`.
//!
//! The [`Authenticator`] trait is the seam the retry layer logs in through;
//! [`HttpAuthenticator`] is the real implementation.

use std::future::Future;

use reqwest::StatusCode;
use reqwest::header::SET_COOKIE;
use tracing::{debug, info};

use super::http::HttpExecutor;
use super::session::{Credentials, Session, SessionCookie};
use crate::error::{Result, WatchError};

/// Path of the login endpoint, relative to the base URL.
pub const LOGIN_PATH: &str = "/auth/login";

/// Produces a fresh [`Session`] from credentials.
///
/// Implementations must not retry internally and must not touch any shared
/// session; the caller installs the returned session.
pub trait Authenticator: Send + Sync {
    /// Perform one login exchange.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::AuthRejected`] for a non-200 answer, or a
    /// transport error if the endpoint could not be reached.
    fn login(&self, credentials: &Credentials) -> impl Future<Output = Result<Session>> + Send;
}

/// Form-encoded login against the API, collecting every `Set-Cookie`.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    executor: HttpExecutor,
}

impl HttpAuthenticator {
    #[must_use]
    pub const fn new(executor: HttpExecutor) -> Self {
        Self { executor }
    }
}

impl Authenticator for HttpAuthenticator {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let url = self.executor.url(LOGIN_PATH);
        debug!(username = %credentials.username, %url, "Logging in");

        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .executor
            .client()
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| WatchError::from_reqwest(&e, &url, self.executor.timeout().as_secs()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WatchError::AuthRejected {
                status: status.as_u16(),
            });
        }

        let cookies: Vec<SessionCookie> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(SessionCookie::parse_set_cookie)
            .collect();

        info!(cookies = cookies.len(), "Login succeeded");
        Ok(Session::new(cookies))
    }
}
