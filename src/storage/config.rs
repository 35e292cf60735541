//! Configuration file loading and resolution.
//!
//! Loads configuration from `config.toml` in the platform config directory
//! (`~/.config/gswatch/config.toml` on Linux), or the path given with
//! `--config` / `GSWATCH_CONFIG`.
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `GSWATCH_URL`: API base URL
//! - `GSWATCH_USERNAME` / `GSWATCH_PASSWORD`: login credentials
//! - `GSWATCH_INTERVAL`: seconds between scan cycles
//! - `GSWATCH_TIMEOUT`: per-request timeout in seconds
//! - `GSWATCH_MAX_RETRIES`: attempts per API call
//! - `GSWATCH_RETRY_DELAY`: seconds between attempts
//! - `GSWATCH_NOTIFY_URL`: webhook for deletion events
//! - `GSWATCH_CONFIG`: override config file path

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::Cli;
use crate::core::logging::{self, LogLevel};
use crate::core::retry::RetryPolicy;
use crate::core::session::Credentials;
use crate::error::{Result, WatchError};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_URL: &str = "GSWATCH_URL";
pub const ENV_USERNAME: &str = "GSWATCH_USERNAME";
pub const ENV_PASSWORD: &str = "GSWATCH_PASSWORD";
pub const ENV_INTERVAL: &str = "GSWATCH_INTERVAL";
pub const ENV_TIMEOUT: &str = "GSWATCH_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "GSWATCH_MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "GSWATCH_RETRY_DELAY";
pub const ENV_NOTIFY_URL: &str = "GSWATCH_NOTIFY_URL";
/// Read by clap for `--config`.
pub const ENV_CONFIG: &str = "GSWATCH_CONFIG";

// =============================================================================
// Defaults and Bounds
// =============================================================================

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

const INTERVAL_RANGE: (u64, u64) = (1, 86_400);
const TIMEOUT_RANGE: (u64, u64) = (1, 300);
const MAX_RETRIES_RANGE: (u32, u32) = (1, 20);
const RETRY_DELAY_MAX: u64 = 300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Final configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// API base URL without a trailing slash.
    pub base_url: String,
    pub credentials: Credentials,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub notify_url: Option<String>,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub base_url: ConfigSource,
    pub username: ConfigSource,
    pub password: ConfigSource,
    pub interval: ConfigSource,
    pub request_timeout: ConfigSource,
    pub max_retries: ConfigSource,
    pub retry_delay: ConfigSource,
    pub notify_url: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Env,
    ConfigFile,
    #[default]
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Looks up an environment variable by name.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Reads the process environment, treating blank values as unset.
#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ResolvedConfig {
    /// Resolve from CLI args, the process environment, and `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a value is malformed, out of range,
    /// or the password is missing.
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        Self::resolve_with(cli, config, &process_env)
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// See [`ResolvedConfig::resolve`].
    pub fn resolve_with(cli: &Cli, config: &Config, env: EnvLookup<'_>) -> Result<Self> {
        config.validate()?;
        let mut sources = ConfigSources::default();

        let base_url = resolve_value(
            cli.url.clone(),
            env,
            ENV_URL,
            config.api.base_url.clone(),
            Some(DEFAULT_BASE_URL.to_string()),
            &mut sources.base_url,
        )?
        .unwrap_or_default();
        let base_url = normalize_base_url(&base_url)?;

        let username = resolve_value(
            cli.username.clone(),
            env,
            ENV_USERNAME,
            config.api.username.clone(),
            Some(DEFAULT_USERNAME.to_string()),
            &mut sources.username,
        )?
        .unwrap_or_default();
        if username.trim().is_empty() {
            return Err(invalid("username", "must not be empty"));
        }

        let password = resolve_value(
            cli.password.clone(),
            env,
            ENV_PASSWORD,
            config.api.password.clone(),
            None,
            &mut sources.password,
        )?
        .ok_or(WatchError::MissingCredential {
            name: "password",
            env: ENV_PASSWORD,
        })?;
        if password.is_empty() {
            return Err(invalid("password", "must not be empty"));
        }

        let interval = resolve_value(
            cli.interval,
            env,
            ENV_INTERVAL,
            Some(config.polling.interval_seconds),
            None,
            &mut sources.interval,
        )?
        .unwrap_or(DEFAULT_INTERVAL_SECS);
        check_range("interval", interval, INTERVAL_RANGE)?;

        let timeout = resolve_value(
            cli.timeout,
            env,
            ENV_TIMEOUT,
            Some(config.polling.request_timeout_seconds),
            None,
            &mut sources.request_timeout,
        )?
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
        check_range("timeout", timeout, TIMEOUT_RANGE)?;

        let max_retries = resolve_value(
            cli.max_retries,
            env,
            ENV_MAX_RETRIES,
            Some(config.polling.max_retries),
            None,
            &mut sources.max_retries,
        )?
        .unwrap_or(DEFAULT_MAX_RETRIES);
        check_range("max_retries", max_retries, MAX_RETRIES_RANGE)?;

        let retry_delay = resolve_value(
            cli.retry_delay,
            env,
            ENV_RETRY_DELAY,
            Some(config.polling.retry_delay_seconds),
            None,
            &mut sources.retry_delay,
        )?
        .unwrap_or(DEFAULT_RETRY_DELAY_SECS);
        check_range("retry_delay", retry_delay, (0, RETRY_DELAY_MAX))?;

        let notify_url = resolve_value(
            cli.notify_url.clone(),
            env,
            ENV_NOTIFY_URL,
            config.notify.webhook_url.clone(),
            None,
            &mut sources.notify_url,
        )?
        .map(|url| normalize_url("notify_url", &url))
        .transpose()?;

        Ok(Self {
            base_url,
            credentials: Credentials::new(username, password),
            interval: Duration::from_secs(interval),
            request_timeout: Duration::from_secs(timeout),
            retry: RetryPolicy::new(max_retries, Duration::from_secs(retry_delay)),
            notify_url,
            sources,
        })
    }

    /// Log the effective settings and where each came from.
    pub fn log_summary(&self) {
        tracing::info!(
            base_url = %self.base_url,
            username = %self.credentials.username,
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.request_timeout.as_secs(),
            max_retries = self.retry.max_retries,
            retry_delay_secs = self.retry.retry_delay.as_secs(),
            notify = self.notify_url.is_some(),
            "Resolved configuration"
        );
        tracing::debug!(
            base_url = %self.sources.base_url,
            username = %self.sources.username,
            password = %self.sources.password,
            interval = %self.sources.interval,
            timeout = %self.sources.request_timeout,
            max_retries = %self.sources.max_retries,
            retry_delay = %self.sources.retry_delay,
            notify_url = %self.sources.notify_url,
            "Configuration sources"
        );
    }
}

/// Pick a value by precedence, recording where it came from.
///
/// `file` is `Some` for file-backed settings that carry their own default;
/// those are reported as coming from the config file.
fn resolve_value<T>(
    cli: Option<T>,
    env: EnvLookup<'_>,
    env_key: &str,
    file: Option<T>,
    default: Option<T>,
    source: &mut ConfigSource,
) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    // 1. CLI flag
    if let Some(value) = cli {
        *source = ConfigSource::Cli;
        return Ok(Some(value));
    }

    // 2. Environment variable
    if let Some(raw) = env(env_key) {
        *source = ConfigSource::Env;
        // Strings keep the value as given; only a failed parse retries trimmed.
        return raw
            .parse()
            .or_else(|_| raw.trim().parse())
            .map(Some)
            .map_err(|e| invalid(env_key, &format!("cannot parse '{raw}': {e}")));
    }

    // 3. Config file
    if let Some(value) = file {
        *source = ConfigSource::ConfigFile;
        return Ok(Some(value));
    }

    // 4. Default
    *source = ConfigSource::Default;
    Ok(default)
}

fn check_range<T>(key: &str, value: T, (min, max): (T, T)) -> Result<()>
where
    T: PartialOrd + fmt::Display,
{
    if value < min || value > max {
        return Err(invalid(key, &format!("{value} is outside {min}..={max}")));
    }
    Ok(())
}

/// Validate an http(s) URL and strip trailing slashes.
///
/// # Errors
///
/// Returns [`WatchError::ConfigInvalid`] for anything but an http(s) URL.
pub fn normalize_base_url(url: &str) -> Result<String> {
    normalize_url("base_url", url)
}

fn normalize_url(key: &str, url: &str) -> Result<String> {
    let url = url.trim();
    let has_scheme = url.starts_with("http://") || url.starts_with("https://");
    let trimmed = url.trim_end_matches('/');
    if !has_scheme || trimmed.ends_with(':') || trimmed.ends_with("//") {
        return Err(invalid(
            key,
            &format!("'{url}' must be an http:// or https:// URL"),
        ));
    }
    Ok(trimmed.to_string())
}

fn invalid(key: &str, message: &str) -> WatchError {
    WatchError::ConfigInvalid {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Log level by precedence: `--log-level`, `GSWATCH_LOG`, config file,
/// then `info`.
#[must_use]
pub fn resolve_log_level(cli: &Cli, config: Option<&Config>) -> LogLevel {
    cli.log_level
        .as_deref()
        .and_then(LogLevel::from_arg)
        .or_else(logging::parse_log_level_from_env)
        .or_else(|| {
            config
                .and_then(|c| c.general.log_level.as_deref())
                .and_then(LogLevel::from_arg)
        })
        .unwrap_or_default()
}

// =============================================================================
// Config File
// =============================================================================

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub notify: NotifyConfig,
    pub general: GeneralConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `[polling]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

/// `[notify]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
}

/// `[general]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECS,
            request_timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl Config {
    /// Load from the default config file path.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(Self::load, Self::load_from)
    }

    /// Load from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WatchError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Default config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate the values stored in the file.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ConfigInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = &self.general.log_level
            && LogLevel::from_arg(level).is_none()
        {
            return Err(invalid(
                "general.log_level",
                &format!("unknown level '{level}'"),
            ));
        }
        if let Some(url) = &self.api.base_url {
            normalize_url("api.base_url", url)?;
        }
        if let Some(url) = &self.notify.webhook_url {
            normalize_url("notify.webhook_url", url)?;
        }

        let polling = &self.polling;
        check_range("polling.interval_seconds", polling.interval_seconds, INTERVAL_RANGE)?;
        check_range(
            "polling.request_timeout_seconds",
            polling.request_timeout_seconds,
            TIMEOUT_RANGE,
        )?;
        check_range("polling.max_retries", polling.max_retries, MAX_RETRIES_RANGE)?;
        check_range(
            "polling.retry_delay_seconds",
            polling.retry_delay_seconds,
            (0, RETRY_DELAY_MAX),
        )?;

        Ok(())
    }
}
