//! Background Task Lifecycle - One-shot Close with Join
//!
//! Every long-lived component in this crate owns exactly one background
//! task. This module packages the lifecycle those components share: spawn
//! the task with a shutdown receiver, and on close signal it, then block
//! until it has observably stopped. Close is idempotent — the second and
//! every later call return immediately.

use std::future::Future;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::error;

/// Handle to a single supervised background task.
///
/// The task receives a `broadcast::Receiver<()>` and must return promptly
/// once the receiver yields. After [`BackgroundTask::close`] resolves, the
/// task is guaranteed to have exited; no task ever leaks past a close.
pub struct BackgroundTask {
    /// One-shot close signal. Also observed by in-flight selects inside
    /// the task, so a pending sleep or fetch is interrupted, not awaited.
    shutdown_tx: broadcast::Sender<()>,
    /// Join handle, consumed by the first close call.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundTask {
    /// Spawn `task` on the runtime, wired to this handle's close signal.
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(task(shutdown_rx));

        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// An additional receiver for the close signal.
    ///
    /// Used by tasks that need to observe shutdown at more than one await
    /// point without threading a single receiver through.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal the task to stop and wait until it has exited.
    ///
    /// Idempotent: later calls find the handle already taken and return
    /// immediately. A send error just means the task already dropped its
    /// receiver and is on its way out.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(());

        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(error = %e, "background task panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask").finish_non_exhaustive()
    }
}
