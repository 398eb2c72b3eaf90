//! Dispatcher loop. Offers the pending-list head to the next idle worker.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handoff::Offerer;
use crate::error::StoreError;
use crate::tasks::{TaskId, TaskStore};

/// Default back-off while the pending list is empty: 5 seconds.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_secs(5);

/// Default re-check delay while an offered head is still unclaimed.
pub const DEFAULT_CLAIM_POLL: Duration = Duration::from_millis(10);

/// Dispatcher timing.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Wait before re-checking an empty pending list.
    pub idle_backoff: Duration,
    /// Wait before re-checking a head that was offered but not yet claimed.
    pub claim_poll: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            claim_poll: DEFAULT_CLAIM_POLL,
        }
    }
}

/// Single loop feeding the worker pool, one task id at a time.
pub struct Dispatcher {
    store: Arc<TaskStore>,
    offerer: Offerer,
    config: DispatcherConfig,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        store: Arc<TaskStore>,
        offerer: Offerer,
        config: DispatcherConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            offerer,
            config,
            cancel,
        }
    }

    /// Run until cancelled.
    ///
    /// Each cycle peeks the head, skips it if it is the id already handed
    /// out and still unclaimed, otherwise offers it and blocks until a worker
    /// takes it.
    pub async fn run(self) {
        let Self {
            store,
            mut offerer,
            config,
            cancel,
        } = self;

        info!(
            idle_backoff_ms = config.idle_backoff.as_millis() as u64,
            "Dispatcher started"
        );

        let mut last_offered: Option<TaskId> = None;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let head = match store.peek_head().await {
                Ok(id) => id,
                Err(StoreError::EmptyQueue) => {
                    debug!("Queue has no tasks, idling");
                    if !pause(&cancel, config.idle_backoff).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "Dispatcher cannot read queue");
                    break;
                }
            };

            if last_offered == Some(head) {
                if !pause(&cancel, config.claim_poll).await {
                    break;
                }
                continue;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                offered = offerer.offer(head) => match offered {
                    Ok(()) => {
                        last_offered = Some(head);
                        debug!(task_id = head, "Task handed to worker");
                    }
                    Err(e) => {
                        warn!(error = %e, "Dispatcher lost all workers");
                        break;
                    }
                }
            }
        }

        info!("Dispatcher stopped");
    }
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancel.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
