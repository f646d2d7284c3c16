//! Configuration Module - TOML-based Synchronization Settings
//!
//! Loads and validates configuration from a TOML file. Only the
//! synchronization layer's own knobs live here: the RPC endpoint, the
//! watched-account set, the gas cache interval, and the block stream
//! parameters. Everything else belongs to the embedding application.

pub mod loader;

use std::time::Duration;

use alloy::primitives::Address;
use serde::Deserialize;

use crate::adapters::chain::BlockSourceConfig;

/// Top-level configuration of the synchronization layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// RPC endpoint settings.
    pub rpc: RpcConfig,
    /// Nonce tracking settings.
    #[serde(default)]
    pub nonce: NonceConfig,
    /// Gas price cache settings.
    #[serde(default)]
    pub gas: GasConfig,
    /// Block stream settings.
    #[serde(default)]
    pub blocks: BlockConfig,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Node RPC endpoint URL.
    pub url: String,
    /// When set, the node's chain ID is validated at connect time.
    pub expected_chain_id: Option<u64>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Nonce tracking configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NonceConfig {
    /// Accounts whose nonces are tracked locally. All other accounts
    /// pass through to the node untouched.
    #[serde(default)]
    pub watched_accounts: Vec<Address>,
}

/// Gas price cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    /// Seconds between background refreshes of the suggested gas price.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl GasConfig {
    /// Refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Block stream configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockConfig {
    /// Height to start delivery from; unset derives it from the head.
    pub start_block: Option<u64>,
    /// Required confirmation depth before a block is delivered.
    #[serde(default)]
    pub confirmations: u64,
    /// Seconds to back off after a failed or premature fetch.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            start_block: None,
            confirmations: 0,
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl From<&BlockConfig> for BlockSourceConfig {
    fn from(config: &BlockConfig) -> Self {
        Self {
            start_block: config.start_block,
            confirmations: config.confirmations,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

// Default value functions for serde

fn default_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    4
}

fn default_retry_delay() -> u64 {
    4
}
