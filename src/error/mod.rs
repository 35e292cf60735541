//! Error types for gswatch.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Authentication**: Login rejected, session expired mid-operation
//! - **Network**: Connection, timeout or other transport issues
//! - **Api**: Non-success responses and malformed bodies from the API
//! - **Configuration**: Config file parsing, validation, or missing values
//! - **Internal**: Lifecycle misuse, I/O, and unclassified errors
//!
//! Each error has a stable error code (e.g., `GSW-A001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication issues (login rejected, session expired).
    Authentication,
    /// Network issues (timeout, connection refused, DNS).
    Network,
    /// API issues (unexpected status codes, malformed payloads, exhausted retries).
    Api,
    /// Configuration issues (parse errors, invalid values, missing credentials).
    Configuration,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Api => "API error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Api => "P",
            Self::Configuration => "C",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success, including a clean shutdown after a termination signal.
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Invalid or missing configuration
    ConfigError = 2,
    /// Credentials rejected at startup
    AuthFailed = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

impl From<ExitCode> for u8 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for gswatch operations.
#[derive(Error, Debug)]
pub enum WatchError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// The login endpoint rejected the credentials.
    #[error("login rejected with status {status}")]
    AuthRejected { status: u16 },

    /// A request came back 401 while using the current session.
    #[error("session expired (HTTP 401)")]
    AuthExpired,

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out after the configured request timeout.
    #[error("request timeout after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    /// Connection-level failure (refused, reset, DNS, TLS).
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    // ==========================================================================
    // API errors (Category: Api)
    // ==========================================================================
    /// The API answered with an unexpected, non-401 status code.
    #[error("API returned status {status} for {method} {path}")]
    Api {
        method: String,
        path: String,
        status: u16,
    },

    /// Failed to parse an API response body.
    #[error("failed to parse response from {path}: {message}")]
    ParseResponse { path: String, message: String },

    /// The retry budget was consumed without success.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<WatchError>,
    },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid { key: String, message: String },

    /// A required credential was not supplied by any configuration source.
    #[error("missing {name}: pass --{name}, set {env}, or add it to the config file")]
    MissingCredential { name: &'static str, env: &'static str },

    // ==========================================================================
    // Lifecycle errors (Category: Internal)
    // ==========================================================================
    /// The operation was interrupted by a shutdown request.
    #[error("operation cancelled")]
    Cancelled,

    /// `start()` was called on a poller that is already running.
    #[error("poller already running")]
    AlreadyRunning,

    /// `stop()` was called on a poller that is not running.
    #[error("poller not running")]
    NotRunning,

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchError {
    /// Map error to a process exit code.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::MissingCredential { .. } => ExitCode::ConfigError,

            Self::AuthRejected { .. } | Self::AuthExpired => ExitCode::AuthFailed,

            Self::Timeout { .. } => ExitCode::Timeout,

            Self::Exhausted { last, .. } => last.exit_code(),

            Self::Transport { .. }
            | Self::Api { .. }
            | Self::ParseResponse { .. }
            | Self::Cancelled
            | Self::AlreadyRunning
            | Self::NotRunning
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthRejected { .. } | Self::AuthExpired => ErrorCategory::Authentication,

            Self::Timeout { .. } | Self::Transport { .. } => ErrorCategory::Network,

            Self::Api { .. } | Self::ParseResponse { .. } | Self::Exhausted { .. } => {
                ErrorCategory::Api
            }

            Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::MissingCredential { .. } => ErrorCategory::Configuration,

            Self::Cancelled
            | Self::AlreadyRunning
            | Self::NotRunning
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `GSW-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AuthRejected { .. } => "GSW-A001",
            Self::AuthExpired => "GSW-A002",

            Self::Timeout { .. } => "GSW-N001",
            Self::Transport { .. } => "GSW-N002",

            Self::Api { .. } => "GSW-P001",
            Self::ParseResponse { .. } => "GSW-P002",
            Self::Exhausted { .. } => "GSW-P003",

            Self::ConfigParse { .. } => "GSW-C001",
            Self::ConfigInvalid { .. } => "GSW-C002",
            Self::MissingCredential { .. } => "GSW-C003",

            Self::Cancelled => "GSW-X001",
            Self::AlreadyRunning => "GSW-X002",
            Self::NotRunning => "GSW-X003",
            Self::Io(_) => "GSW-X010",
            Self::Json(_) => "GSW-X011",
            Self::Other(_) => "GSW-X099",
        }
    }

    /// Whether this error is a transport-level failure (network or timeout).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    /// Whether the server reported an expired session, directly or as the
    /// last error of an exhausted retry budget.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::AuthExpired => true,
            Self::Exhausted { last, .. } => last.is_auth_expired(),
            _ => false,
        }
    }

    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AuthRejected { status } | Self::Api { status, .. } => Some(*status),
            Self::AuthExpired => Some(401),
            Self::Exhausted { last, .. } => last.status_code(),
            _ => None,
        }
    }

    /// Build a transport error from a `reqwest` failure, keeping timeouts distinct.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                seconds: timeout_secs,
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Result type alias for gswatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

// =============================================================================
// Tests
// =============================================================================
