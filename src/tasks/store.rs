//! In-memory task map plus the pending-id list, behind one lock.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::{TaskId, TaskParams, TaskRecord, TaskStatus};
use crate::error::StoreError;

/// Initial capacity of the pending list.
const PENDING_CAPACITY: usize = 100;

/// Everything guarded by the store lock. Map, pending list and id counter
/// always change together.
struct StoreInner {
    tasks: BTreeMap<TaskId, TaskRecord>,
    pending: VecDeque<TaskId>,
    next_id: TaskId,
}

impl StoreInner {
    fn pending_index(&self, id: TaskId) -> Option<usize> {
        self.pending.iter().position(|&pending_id| pending_id == id)
    }

    fn remove_pending(&mut self, id: TaskId) -> bool {
        match self.pending_index(id) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }

    fn transition(&mut self, id: TaskId, target: TaskStatus) -> Result<&mut TaskRecord, StoreError> {
        let record = self
            .tasks
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        record
            .transition_to(target)
            .map_err(|from| StoreError::InvalidTransition { id, from, to: target })?;
        Ok(record)
    }
}

/// Concurrency-safe owner of all task records.
///
/// Every operation except [`TaskStore::delete`] and [`TaskStore::abort`]
/// fails with [`StoreError::Shutdown`] once the shutdown token is cancelled.
/// The lock is never held across an await on anything other than itself.
pub struct TaskStore {
    inner: RwLock<StoreInner>,
    shutdown: CancellationToken,
}

impl TaskStore {
    /// Create an empty store bound to the process shutdown token.
    pub fn new(shutdown: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(StoreInner {
                tasks: BTreeMap::new(),
                pending: VecDeque::with_capacity(PENDING_CAPACITY),
                next_id: 1,
            }),
            shutdown,
        })
    }

    fn ensure_running(&self) -> Result<(), StoreError> {
        if self.shutdown.is_cancelled() {
            return Err(StoreError::Shutdown);
        }
        Ok(())
    }

    /// Insert a new queued task and append it to the pending list.
    pub async fn submit(&self, params: TaskParams) -> Result<TaskId, StoreError> {
        let mut inner = self.inner.write().await;
        self.ensure_running()?;

        let id = inner.next_id;
        inner.next_id += 1;
        inner.tasks.insert(id, TaskRecord::new(id, params));
        inner.pending.push_back(id);

        debug!(task_id = id, pending = inner.pending.len(), "Task appended to queue list");
        info!(task_id = id, "New task created");
        Ok(id)
    }

    /// Snapshot of a single task.
    pub async fn get(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        self.ensure_running()?;

        let inner = self.inner.read().await;
        let mut record = inner
            .tasks
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id })?;
        if record.status == TaskStatus::Queued {
            record.queue_position = inner.pending_index(id);
        }
        Ok(record)
    }

    /// Snapshot of all tasks in ascending id order, queued tasks annotated
    /// with their current pending-list index.
    pub async fn list(&self) -> Result<Vec<TaskRecord>, StoreError> {
        self.ensure_running()?;

        let inner = self.inner.read().await;
        let positions: HashMap<TaskId, usize> = inner
            .pending
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let tasks: Vec<TaskRecord> = inner
            .tasks
            .values()
            .map(|record| {
                let mut record = record.clone();
                if record.status == TaskStatus::Queued {
                    record.queue_position = positions.get(&record.id).copied();
                }
                record
            })
            .collect();

        debug!(count = tasks.len(), "Task list retrieved");
        Ok(tasks)
    }

    /// Current pending-list head, without removing it.
    pub async fn peek_head(&self) -> Result<TaskId, StoreError> {
        self.ensure_running()?;
        self.inner
            .read()
            .await
            .pending
            .front()
            .copied()
            .ok_or(StoreError::EmptyQueue)
    }

    /// Remove and return the current pending-list head.
    pub async fn dequeue_head(&self) -> Result<TaskId, StoreError> {
        self.ensure_running()?;
        let id = self
            .inner
            .write()
            .await
            .pending
            .pop_front()
            .ok_or(StoreError::EmptyQueue)?;
        debug!(task_id = id, "Task removed from queue list head");
        Ok(id)
    }

    /// Remove `id` from the pending list wherever it sits.
    pub async fn retire(&self, id: TaskId) -> Result<(), StoreError> {
        self.ensure_running()?;
        if self.inner.write().await.remove_pending(id) {
            debug!(task_id = id, "Task removed from queue list");
            Ok(())
        } else {
            Err(StoreError::NotQueued { id })
        }
    }

    /// Take ownership of a queued task: `Queued -> InProgress` and out of the
    /// pending list, under a single lock acquisition.
    pub async fn claim(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        let mut inner = self.inner.write().await;
        self.ensure_running()?;

        let record = inner.transition(id, TaskStatus::InProgress)?.clone();
        inner.remove_pending(id);

        debug!(task_id = id, "Task claimed");
        Ok(record)
    }

    /// Write progress of an in-progress task.
    pub async fn record_progress(
        &self,
        id: TaskId,
        iteration: u64,
        value: f64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        self.ensure_running()?;

        let record = inner
            .tasks
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        if record.status != TaskStatus::InProgress {
            return Err(StoreError::InvalidTransition {
                id,
                from: record.status,
                to: TaskStatus::InProgress,
            });
        }
        record.current_iteration = iteration;
        record.current_value = value;
        Ok(())
    }

    /// `InProgress -> Completed`.
    pub async fn complete(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        let mut inner = self.inner.write().await;
        self.ensure_running()?;

        let record = inner.transition(id, TaskStatus::Completed)?.clone();
        info!(task_id = id, value = record.current_value, "Task completed");
        Ok(record)
    }

    /// `InProgress -> Aborted`. Allowed during shutdown.
    pub async fn abort(&self, id: TaskId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.transition(id, TaskStatus::Aborted)?;
        warn!(
            task_id = id,
            iteration = record.current_iteration,
            "Task aborted before completion"
        );
        Ok(())
    }

    /// Remove a task. Idempotent; a no-op once shutdown has begun.
    pub async fn delete(&self, id: TaskId) {
        if self.shutdown.is_cancelled() {
            warn!(task_id = id, "Skipping task deletion, service is shutting down");
            return;
        }

        let mut inner = self.inner.write().await;
        inner.remove_pending(id);
        if inner.tasks.remove(&id).is_some() {
            debug!(task_id = id, "Task deleted");
        }
    }

    /// Delete `id` once `after` has elapsed. The timer is dropped on shutdown.
    pub fn schedule_deletion(self: &Arc<Self>, id: TaskId, after: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => store.delete(id).await,
                _ = store.shutdown.cancelled() => {
                    debug!(task_id = id, "Deletion timer dropped on shutdown");
                }
            }
        });
    }

    /// Every record as it stands, readable after shutdown. Used for the exit
    /// summary.
    pub async fn snapshot(&self) -> Vec<TaskRecord> {
        self.inner.read().await.tasks.values().cloned().collect()
    }

    /// Number of stored tasks, any status.
    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    /// Check if the store holds no tasks.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tasks.is_empty()
    }

    /// Number of tasks waiting in the pending list.
    pub async fn pending_len(&self) -> usize {
        self.inner.read().await.pending.len()
    }
}
