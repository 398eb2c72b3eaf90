//! Surface of the task store the HTTP layer is allowed to touch.

use async_trait::async_trait;

use super::model::{TaskId, TaskParams, TaskRecord};
use super::store::TaskStore;
use crate::error::StoreError;

/// Submission and polling interface over the task store.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Queue a new progression job.
    async fn add_task(&self, params: TaskParams) -> Result<TaskId, StoreError>;

    /// All tasks in ascending id order.
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError>;

    /// A single task by id.
    async fn get_task(&self, id: TaskId) -> Result<TaskRecord, StoreError>;

    /// `(stored, pending)` counts for health reporting.
    async fn counts(&self) -> (usize, usize);
}

#[async_trait]
impl TaskQueue for TaskStore {
    async fn add_task(&self, params: TaskParams) -> Result<TaskId, StoreError> {
        self.submit(params).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        self.list().await
    }

    async fn get_task(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        self.get(id).await
    }

    async fn counts(&self) -> (usize, usize) {
        (self.len().await, self.pending_len().await)
    }
}
