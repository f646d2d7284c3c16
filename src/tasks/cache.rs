//! Polling Cache - Background-refreshed Scalar Values
//!
//! Generic cache for values that are expensive to fetch but must be read
//! instantly: a reader gets the most recent good value without ever
//! touching the network. A single background task refreshes the value on
//! an interval; fetch failures are logged and retried at the next tick,
//! never surfaced to readers.
//!
//! The value lives in a `tokio::sync::watch` channel: reads are
//! synchronous, never torn, and keep working after the refresher has been
//! closed.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, watch};
use tracing::warn;

use super::shutdown::BackgroundTask;

/// A scalar value kept fresh by a periodic background fetch.
pub struct PollingCache<T> {
    value_rx: watch::Receiver<T>,
    task: BackgroundTask,
}

impl<T> PollingCache<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a cache by performing the first fetch synchronously.
    ///
    /// The cache is not considered ready until one real value exists, so
    /// a failing first fetch fails construction.
    pub async fn new<F, Fut>(fetch: F, interval: Duration) -> anyhow::Result<Self>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let initial = fetch().await.context("initial cache fetch failed")?;
        Ok(Self::with_initial(initial, fetch, interval))
    }

    /// Create a cache from an already-known initial value.
    ///
    /// Starts exactly one background refresh task.
    pub fn with_initial<F, Fut>(initial: T, fetch: F, interval: Duration) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (value_tx, value_rx) = watch::channel(initial);
        let task = BackgroundTask::spawn(move |shutdown_rx| {
            refresh_loop(value_tx, fetch, interval, shutdown_rx)
        });

        Self { value_rx, task }
    }

    /// The most recently known good value. Never blocks, never errors.
    pub fn read(&self) -> T {
        self.value_rx.borrow().clone()
    }

    /// Stop the refresh task and wait for it to exit. Idempotent.
    ///
    /// [`PollingCache::read`] keeps returning the last cached value after
    /// close.
    pub async fn close(&self) {
        self.task.close().await;
    }
}

impl<T> std::fmt::Debug for PollingCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingCache").finish_non_exhaustive()
    }
}

/// The single background refresh loop.
///
/// The interval sleep and the fetch itself are both raced against the
/// close signal, so close interrupts a pending sleep and abandons an
/// in-flight fetch rather than awaiting it.
async fn refresh_loop<T, F, Fut>(
    value_tx: watch::Sender<T>,
    fetch: F,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    T: Clone + PartialEq,
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            () = tokio::time::sleep(interval) => {}
        }

        let fetched = tokio::select! {
            _ = shutdown_rx.recv() => return,
            result = fetch() => result,
        };

        match fetched {
            Ok(value) => {
                // Skip the write when the value hasn't changed.
                value_tx.send_if_modified(|current| {
                    if *current == value {
                        false
                    } else {
                        *current = value;
                        true
                    }
                });
            }
            Err(e) => warn!(error = %e, "cache refresh failed, keeping previous value"),
        }
    }
}
