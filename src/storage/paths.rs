//! Application paths.

use directories::ProjectDirs;
use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Platform directories used by gswatch.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "gswatch") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
            }
        } else {
            // No home directory; fall back to the working directory.
            let home = directories::BaseDirs::new()
                .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
            Self {
                config: home.join(".config/gswatch"),
            }
        }
    }

    /// Default location of `config.toml`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join(CONFIG_FILE_NAME)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths::new();
        let file = paths.config_file();
        assert!(file.starts_with(&paths.config));
        assert_eq!(file.file_name().and_then(|n| n.to_str()), Some("config.toml"));
    }
}
