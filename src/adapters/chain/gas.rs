//! Gas Price Cache - Non-blocking Fee Estimates
//!
//! Keeps the node's suggested gas price available for instant reads.
//! Transaction-building paths must never wait on a network round-trip
//! just to price a transaction, so the value is refreshed by a
//! background task and served from memory.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::ports::ChainBackend;
use crate::tasks::PollingCache;

/// Cached suggested gas price, in wei.
///
/// Construction performs one synchronous fetch so the cache never hands
/// out a made-up value; afterwards a single background task refreshes
/// the price on the configured interval. Refresh failures keep the
/// previous value.
pub struct GasPriceCache {
    cache: PollingCache<u128>,
}

impl GasPriceCache {
    /// Refresh interval used when none is configured.
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(4);

    /// Fetch the current suggested price and start the refresh task.
    ///
    /// Fails when the first fetch fails.
    pub async fn new<B>(backend: Arc<B>, refresh_interval: Duration) -> anyhow::Result<Self>
    where
        B: ChainBackend + ?Sized,
    {
        let cache = PollingCache::new(
            move || {
                let backend = Arc::clone(&backend);
                async move {
                    backend
                        .suggest_gas_price()
                        .await
                        .context("suggest_gas_price")
                }
            },
            refresh_interval,
        )
        .await
        .context("gas price cache: initial fetch")?;

        info!(interval_secs = refresh_interval.as_secs(), "gas price cache started");

        Ok(Self { cache })
    }

    /// The most recently fetched suggested gas price. Never blocks.
    pub fn suggest_gas_price(&self) -> u128 {
        self.cache.read()
    }

    /// Stop the refresh task. Idempotent; reads keep working afterwards.
    pub async fn close(&self) {
        self.cache.close().await;
    }
}

impl std::fmt::Debug for GasPriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GasPriceCache").finish_non_exhaustive()
    }
}
