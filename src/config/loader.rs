//! Configuration Loader - File Loading and Validation
//!
//! Handles loading the TOML configuration file, validating all
//! parameters, and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::SyncConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<SyncConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;

    info!(
        watched_accounts = config.nonce.watched_accounts.len(),
        confirmations = config.blocks.confirmations,
        gas_refresh_secs = config.gas.refresh_interval_secs,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SyncConfig> {
    let config: SyncConfig = toml::from_str(content).context("Failed to parse configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &SyncConfig) -> Result<()> {
    anyhow::ensure!(!config.rpc.url.is_empty(), "RPC URL must not be empty");
    anyhow::ensure!(
        config.rpc.timeout_seconds > 0,
        "RPC timeout must be positive, got {}",
        config.rpc.timeout_seconds
    );

    anyhow::ensure!(
        config.gas.refresh_interval_secs > 0,
        "Gas refresh interval must be positive, got {}",
        config.gas.refresh_interval_secs
    );

    anyhow::ensure!(
        config.blocks.retry_delay_secs > 0,
        "Block retry delay must be positive, got {}",
        config.blocks.retry_delay_secs
    );

    let mut seen = std::collections::HashSet::new();
    for account in &config.nonce.watched_accounts {
        anyhow::ensure!(
            seen.insert(account),
            "Watched account {account} is listed twice"
        );
    }

    Ok(())
}
