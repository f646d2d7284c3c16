//! RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Manages the connection to an EVM-compatible node via alloy-rs.
//! Optionally validates the chain ID at startup and exposes a shared
//! provider instance for all chain adapters.
//!
//! In alloy 0.9, `ProviderBuilder::new().on_client()` returns a complex
//! filler type. We store it as a type-erased `dyn Provider` to keep
//! the API clean across the adapter layer.

use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::RpcConfig;

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// All chain adapters share a single provider instance to avoid
/// redundant connections and enable connection pooling.
pub struct RpcProvider {
    /// The alloy HTTP provider (type-erased).
    provider: Arc<dyn Provider + Send + Sync>,
    /// RPC endpoint URL (for diagnostics, never logged with secrets).
    #[allow(dead_code)]
    rpc_url: String,
}

impl RpcProvider {
    /// Connect to the configured RPC endpoint.
    ///
    /// The configured request timeout applies to every RPC round trip.
    /// When `expected_chain_id` is configured, the node's chain ID is
    /// queried and validated at startup, failing fast on a wrong
    /// endpoint.
    #[instrument(skip_all)]
    pub async fn connect(config: &RpcConfig) -> Result<Self> {
        let rpc_url = config.url.clone();
        let url = rpc_url.parse().context("Invalid RPC URL")?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;
        let transport = Http::with_client(http_client, url);
        let provider = ProviderBuilder::new().on_client(RpcClient::new(transport, false).boxed());

        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        if let Some(expected) = config.expected_chain_id {
            let chain_id = provider
                .get_chain_id()
                .await
                .context("Failed to query chain ID")?;

            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected}, got {chain_id}"
            );

            info!(chain_id, "Connected to RPC node");
        } else {
            info!("Connected to RPC node");
        }

        Ok(Self { provider, rpc_url })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider + Send + Sync> {
        Arc::clone(&self.provider)
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
