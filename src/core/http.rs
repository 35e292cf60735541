//! HTTP client utilities.
//!
//! Provides the shared HTTP client and the [`HttpExecutor`], which issues a
//! single request with the current session attached and classifies the
//! response as success, expired session, or failure.

use std::time::Duration;

use reqwest::header::COOKIE;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;

use super::session::Session;
use crate::error::{Result, WatchError};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("gswatch/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| WatchError::Other(anyhow::anyhow!("failed to build HTTP client: {e}")))
}

/// Classified result of one API call.
///
/// `AuthExpired` is kept apart from `Failure` so the retry layer can decide
/// between logging in again and giving up.
#[derive(Debug)]
pub enum CallOutcome<T> {
    Success(T),
    AuthExpired,
    Failure(WatchError),
}

impl<T> CallOutcome<T> {
    /// Chain a fallible step onto the success value; its error becomes a `Failure`.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U>) -> CallOutcome<U> {
        match self {
            Self::Success(value) => match f(value) {
                Ok(next) => CallOutcome::Success(next),
                Err(e) => CallOutcome::Failure(e),
            },
            Self::AuthExpired => CallOutcome::AuthExpired,
            Self::Failure(e) => CallOutcome::Failure(e),
        }
    }
}

impl<T> From<Result<T>> for CallOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(WatchError::AuthExpired) => Self::AuthExpired,
            Err(e) => Self::Failure(e),
        }
    }
}

/// A 2xx response with its body read to completion.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Issues requests against the API base URL with a session attached.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpExecutor {
    /// Create an executor. `timeout` must match the one `client` was built with;
    /// it is only used for error reporting.
    #[must_use]
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Build a client with `timeout` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns error if client construction fails.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::new(build_client(timeout)?, base_url, timeout))
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and classify the response.
    ///
    /// - 2xx: `Success` with the body
    /// - 401: `AuthExpired`
    /// - other status: `Failure(WatchError::Api)`
    /// - network error or timeout: `Failure` with a transport error
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        session: &Session,
    ) -> CallOutcome<ApiResponse> {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(cookie) = session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }

        tracing::trace!(method = %method, %url, "Sending API request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return CallOutcome::Failure(WatchError::from_reqwest(
                    &e,
                    &url,
                    self.timeout.as_secs(),
                ));
            }
        };

        let status = response.status();
        tracing::debug!(method = %method, path, status = status.as_u16(), "API response");

        if status == StatusCode::UNAUTHORIZED {
            return CallOutcome::AuthExpired;
        }

        if !status.is_success() {
            return CallOutcome::Failure(WatchError::Api {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        match response.text().await {
            Ok(body) => CallOutcome::Success(ApiResponse { status, body }),
            Err(e) => CallOutcome::Failure(WatchError::from_reqwest(
                &e,
                &url,
                self.timeout.as_secs(),
            )),
        }
    }

    /// `GET` a path and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        session: &Session,
    ) -> CallOutcome<T> {
        self.execute(Method::GET, path, session)
            .await
            .and_then(|response| {
                serde_json::from_str(&response.body).map_err(|e| WatchError::ParseResponse {
                    path: path.to_string(),
                    message: e.to_string(),
                })
            })
    }

    /// `DELETE` a path. Only HTTP 200 counts as success.
    pub async fn delete(&self, path: &str, session: &Session) -> CallOutcome<()> {
        self.execute(Method::DELETE, path, session)
            .await
            .and_then(|response| {
                if response.status == StatusCode::OK {
                    Ok(())
                } else {
                    Err(WatchError::Api {
                        method: Method::DELETE.to_string(),
                        path: path.to_string(),
                        status: response.status.as_u16(),
                    })
                }
            })
    }
}
