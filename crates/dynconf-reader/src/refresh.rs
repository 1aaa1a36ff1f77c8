//! Background refresh task.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Something the refresh task reloads on every tick.
#[async_trait]
pub(crate) trait Refresh: Send + Sync + 'static {
    async fn refresh_tick(&self);
}

/// Handle for a running refresh task.
///
/// Dropping the handle closes the shutdown channel, which also ends the task
/// at its next wake-up.
#[derive(Debug)]
pub(crate) struct RefreshHandle {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl RefreshHandle {
    /// Spawns a task that calls `target.refresh_tick()` every `interval`.
    ///
    /// The interval is measured from the start of one load to the start of
    /// the next, and loads never overlap: a slow load pushes the next one
    /// back instead of running concurrently. The task only holds a weak
    /// reference, so it exits once the target is gone.
    pub(crate) fn spawn<R: Refresh>(target: Weak<R>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut next_start = Instant::now() + interval;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Refresh task shutting down");
                        break;
                    }
                    _ = sleep_until(next_start) => {}
                }

                let Some(target) = target.upgrade() else {
                    tracing::debug!("Reader dropped, refresh task exiting");
                    break;
                };
                let started = Instant::now();
                target.refresh_tick().await;
                drop(target);

                next_start = started + interval;
            }
        });

        Self { handle, shutdown }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task without waiting for it.
    pub(crate) fn abort(&self) {
        self.handle.abort();
    }

    /// Signals the task to stop and waits for an in-flight load to finish.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}
