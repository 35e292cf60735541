//! `check` command: log in and list models once.

use crate::cli::scan::build_scanner;
use crate::core::scanner::ScanOptions;
use crate::error::Result;
use crate::storage::config::ResolvedConfig;

/// Execute the check command.
///
/// # Errors
///
/// Returns the login error (exit code 3 for rejected credentials), or the
/// error from listing models.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    let mut scanner = build_scanner(config, ScanOptions { dry_run: true })?;

    scanner.login().await?;
    let models = scanner.list_models().await?;

    println!(
        "Logged in to {} as {}; {} model(s) visible",
        config.base_url,
        config.credentials.username,
        models.len()
    );
    Ok(())
}
