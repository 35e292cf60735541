//! Configuration storage.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigSource, ConfigSources, ENV_CONFIG, ENV_INTERVAL, ENV_MAX_RETRIES,
    ENV_NOTIFY_URL, ENV_PASSWORD, ENV_RETRY_DELAY, ENV_TIMEOUT, ENV_URL, ENV_USERNAME,
    ResolvedConfig, resolve_log_level,
};
pub use paths::AppPaths;
