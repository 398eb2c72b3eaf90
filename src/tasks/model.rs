//! Task data model: progression parameters, status machine, and the record
//! the store hands out.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Sequential task identifier, starting at 1.
pub type TaskId = u64;

/// Wire value of `queue_index` once a task has left the pending list.
pub const DISPATCHED_QUEUE_INDEX: i64 = -1;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskStatus {
    /// Waiting in the pending list.
    #[serde(rename = "in queue")]
    Queued,
    /// Claimed by a worker, progression running.
    #[serde(rename = "in progress")]
    InProgress,
    /// All iterations done.
    #[serde(rename = "completed")]
    Completed,
    /// Progression interrupted by shutdown.
    #[serde(rename = "aborted")]
    Aborted,
}

impl TaskStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Queued, InProgress) | (InProgress, Completed) | (InProgress, Aborted)
        )
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "in queue",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// Immutable parameters of an arithmetic progression job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskParams {
    /// Number of elements to produce.
    #[serde(rename = "n")]
    pub elements_number: u64,
    /// Step added on every iteration.
    #[serde(rename = "d")]
    pub delta: f64,
    /// Value before the first iteration.
    #[serde(rename = "n1")]
    pub start_value: f64,
    /// Pause between iterations, in seconds.
    #[serde(rename = "I")]
    pub iteration_interval: f64,
    /// Retention after completion, in seconds.
    #[serde(rename = "TTL")]
    pub ttl: f64,
}

impl TaskParams {
    /// Pause between iterations. Negative or NaN values collapse to zero,
    /// values past the `Duration` range saturate.
    pub fn interval(&self) -> Duration {
        secs_to_duration(self.iteration_interval)
    }

    /// Retention after completion. Negative or NaN values collapse to zero,
    /// values past the `Duration` range saturate.
    pub fn retention(&self) -> Duration {
        secs_to_duration(self.ttl)
    }

    /// Value after `iteration` steps.
    pub fn value_at(&self, iteration: u64) -> f64 {
        self.start_value + iteration as f64 * self.delta
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// A stored progression job with its live progress.
///
/// The store only ever hands out clones of this, so a reader never observes
/// a partially applied update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    #[serde(rename = "task_id")]
    pub id: TaskId,
    #[serde(rename = "task_status")]
    pub status: TaskStatus,
    /// Index in the pending list while `Queued`, `None` afterwards.
    #[serde(rename = "queue_index", serialize_with = "serialize_queue_index")]
    pub queue_position: Option<usize>,
    #[serde(flatten)]
    pub params: TaskParams,
    pub current_iteration: u64,
    pub current_value: f64,
    #[serde(rename = "task_created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "task_started_at")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "task_finished_at")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Create a queued record.
    pub fn new(id: TaskId, params: TaskParams) -> Self {
        Self {
            id,
            status: TaskStatus::Queued,
            queue_position: None,
            current_iteration: 0,
            current_value: params.start_value,
            params,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Move to `target`, stamping the matching timestamp. Returns the
    /// current status on an illegal transition.
    pub fn transition_to(&mut self, target: TaskStatus) -> Result<(), TaskStatus> {
        if !self.status.can_transition_to(target) {
            return Err(self.status);
        }

        self.status = target;
        match target {
            TaskStatus::InProgress => {
                self.started_at = Some(Utc::now());
                self.queue_position = None;
            }
            TaskStatus::Completed | TaskStatus::Aborted => {
                self.finished_at = Some(Utc::now());
                self.queue_position = None;
            }
            TaskStatus::Queued => {}
        }

        Ok(())
    }
}

fn serialize_queue_index<S>(position: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match position {
        Some(idx) => serializer.serialize_i64(*idx as i64),
        None => serializer.serialize_i64(DISPATCHED_QUEUE_INDEX),
    }
}
