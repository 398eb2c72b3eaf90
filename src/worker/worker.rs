//! Pool worker. Claims offered tasks and runs their progression.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handoff::Taker;
use crate::error::{ProgressionError, StoreError};
use crate::tasks::{TaskId, TaskRecord, TaskStore};

/// One member of the worker pool.
pub struct Worker {
    id: usize,
    store: Arc<TaskStore>,
    taker: Taker,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(id: usize, store: Arc<TaskStore>, taker: Taker, cancel: CancellationToken) -> Self {
        Self {
            id,
            store,
            taker,
            cancel,
        }
    }

    /// Receive and process tasks until cancelled.
    pub async fn run(self) {
        debug!(worker_id = self.id, "Worker started");

        loop {
            let task_id = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(worker_id = self.id, "Worker stopped by cancellation");
                    return;
                }
                received = self.taker.take() => match received {
                    Some(id) => id,
                    None => {
                        error!(worker_id = self.id, "Worker stopped, hand-off channel closed");
                        return;
                    }
                }
            };

            debug!(worker_id = self.id, task_id, "Worker received task");
            self.process(task_id).await;
        }
    }

    /// Claim, execute and finalize a single task. Failures are logged and the
    /// task is dropped.
    async fn process(&self, task_id: TaskId) {
        let record = match self.store.claim(task_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                warn!(worker_id = self.id, task_id, "Offered task vanished before claim");
                if let Err(e) = self.store.retire(task_id).await {
                    debug!(task_id, error = %e, "Vanished task was not queued");
                }
                return;
            }
            Err(e) => {
                warn!(worker_id = self.id, task_id, error = %e, "Failed to claim task");
                return;
            }
        };

        info!(
            worker_id = self.id,
            task_id,
            elements = record.params.elements_number,
            "Task started"
        );

        if let Err(e) = self.execute(&record).await {
            match &e {
                ProgressionError::Cancelled { .. } => {
                    info!(worker_id = self.id, task_id, error = %e, "Task interrupted")
                }
                ProgressionError::Store(_) => {
                    error!(worker_id = self.id, task_id, error = %e, "Failed to complete task")
                }
            }
            self.abort(task_id).await;
            return;
        }

        match self.store.complete(task_id).await {
            Ok(done) => {
                let retention = done.params.retention();
                self.store.schedule_deletion(task_id, retention);
                debug!(
                    task_id,
                    ttl_ms = retention.as_millis() as u64,
                    "Task deletion scheduled"
                );
            }
            Err(e) => {
                error!(worker_id = self.id, task_id, error = %e, "Failed to mark task completed");
                self.abort(task_id).await;
            }
        }
    }

    /// Apply every iteration of the progression, writing progress after each
    /// step and waiting the configured interval between steps.
    async fn execute(&self, record: &TaskRecord) -> Result<(), ProgressionError> {
        let params = &record.params;
        let interval = params.interval();
        let mut value = params.start_value;

        for iteration in 1..=params.elements_number {
            if self.cancel.is_cancelled() {
                return Err(ProgressionError::Cancelled {
                    id: record.id,
                    iteration: iteration - 1,
                });
            }

            value += params.delta;
            self.store.record_progress(record.id, iteration, value).await?;

            if iteration < params.elements_number {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        return Err(ProgressionError::Cancelled {
                            id: record.id,
                            iteration,
                        });
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        Ok(())
    }

    async fn abort(&self, task_id: TaskId) {
        if let Err(e) = self.store.abort(task_id).await {
            warn!(worker_id = self.id, task_id, error = %e, "Failed to mark task aborted");
        }
    }
}
