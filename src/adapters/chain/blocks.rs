//! Confirmation-gated Block Source - Ordered Finalized Block Stream
//!
//! Turns the request/response [`ChainReader`] surface into a push-style
//! stream of blocks that each carry at least the configured number of
//! confirmations. A single background task walks the chain one height at
//! a time, self-pacing against block production and network latency;
//! delivery into the bounded channel is the only backpressure mechanism.
//!
//! Reorganizations are not handled: a block once emitted is never
//! retracted or re-fetched. The configured confirmation depth is assumed
//! to cover the consumer's finality needs.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::domain::Block;
use crate::ports::{ChainReader, ReadError};
use crate::tasks::BackgroundTask;

/// Parameters of a [`ConfirmationGatedBlockSource`].
#[derive(Debug, Clone)]
pub struct BlockSourceConfig {
    /// Height to start delivery from. `None` derives the start height
    /// from the chain head minus the confirmation depth.
    pub start_block: Option<u64>,
    /// Blocks that must be mined on top of a block before it is
    /// delivered.
    pub confirmations: u64,
    /// Backoff after a failed or premature fetch.
    pub retry_delay: Duration,
}

impl Default for BlockSourceConfig {
    fn default() -> Self {
        Self {
            start_block: None,
            confirmations: 0,
            retry_delay: Duration::from_secs(4),
        }
    }
}

/// Handle to the block-walking background task.
///
/// Created with [`ConfirmationGatedBlockSource::spawn`], which also
/// returns the delivery channel. The channel yields `None` only after
/// [`close`](Self::close) has fully stopped the task, so no send can
/// ever race the stream's end.
pub struct ConfirmationGatedBlockSource {
    task: BackgroundTask,
}

impl ConfirmationGatedBlockSource {
    /// Start the walker over `reader` and return the delivery channel.
    ///
    /// The channel is bounded at one block: the walker does not run ahead
    /// of a slow consumer.
    pub fn spawn<R: ChainReader>(
        reader: R,
        config: BlockSourceConfig,
    ) -> (Self, mpsc::Receiver<Block>) {
        let (blocks_tx, blocks_rx) = mpsc::channel(1);
        let task =
            BackgroundTask::spawn(move |shutdown_rx| walk(reader, config, blocks_tx, shutdown_rx));

        (Self { task }, blocks_rx)
    }

    /// Stop the walker and wait for it to exit. Idempotent.
    pub async fn close(&self) {
        self.task.close().await;
    }
}

impl std::fmt::Debug for ConfirmationGatedBlockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGatedBlockSource")
            .finish_non_exhaustive()
    }
}

/// Whether the cached head height must be refreshed before the next
/// fetch decision.
///
/// With zero confirmations the head is never needed. Otherwise a refresh
/// is required while the head is unknown, while the chain is shorter
/// than the confirmation depth, or once the cursor is close enough to
/// the frontier that the cached head no longer proves the margin.
fn head_refresh_needed(current: Option<u64>, head: Option<u64>, confirmations: u64) -> bool {
    if confirmations == 0 {
        return false;
    }

    match head {
        None => true,
        Some(head) => {
            head < confirmations || current.is_some_and(|current| current + confirmations > head)
        }
    }
}

/// The single background iteration loop.
///
/// Cursor state is owned here and never shared. Every await point is
/// raced against the shutdown signal, so close interrupts a pending
/// backoff, an in-flight fetch, and a blocked delivery alike.
async fn walk<R: ChainReader>(
    reader: R,
    config: BlockSourceConfig,
    blocks_tx: mpsc::Sender<Block>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let confirmations = config.confirmations;
    let mut current: Option<u64> = config.start_block;
    let mut head: Option<u64> = None;
    let mut delay_before_iteration = false;

    loop {
        if delay_before_iteration {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                () = tokio::time::sleep(config.retry_delay) => delay_before_iteration = false,
            }
        }

        if head_refresh_needed(current, head, confirmations) {
            let fetched = tokio::select! {
                _ = shutdown_rx.recv() => return,
                result = reader.head_number() => result,
            };

            match fetched {
                Ok(number) => head = Some(number),
                Err(e) => {
                    warn!(error = %e, "head height query failed");
                    delay_before_iteration = true;
                    continue;
                }
            }

            // Still too close to the frontier: wait for the chain to grow.
            if head_refresh_needed(current, head, confirmations) {
                delay_before_iteration = true;
                continue;
            }
        }

        if current.is_none() {
            if let Some(head) = head {
                // First height eligible under the confirmation rule.
                current = Some(head.saturating_sub(confirmations));
            }
        }

        let fetched = tokio::select! {
            _ = shutdown_rx.recv() => return,
            result = reader.block_by_number(current) => result,
        };

        match fetched {
            Ok(block) => {
                current = Some(block.number + 1);

                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    sent = blocks_tx.send(block) => {
                        // A closed channel means every consumer is gone.
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(ReadError::NotFound) => {
                // Not produced or indexed yet; wait, this is not an error.
                debug!(height = ?current, "block not available yet");
                delay_before_iteration = true;
            }
            Err(e) => {
                warn!(error = %e, height = ?current, "block fetch failed");
                delay_before_iteration = true;
            }
        }
    }
}
