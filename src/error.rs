//! Error types for the progression queue.

use crate::tasks::model::{TaskId, TaskStatus};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Task store errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("task {id} not found")]
    NotFound { id: TaskId },

    #[error("service is shutting down")]
    Shutdown,

    #[error("task queue list is empty")]
    EmptyQueue,

    #[error("task {id} is not in the queue list")]
    NotQueued { id: TaskId },

    #[error("task {id} is {from}, cannot transition to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Progression execution errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProgressionError {
    #[error("task {id} interrupted by shutdown after iteration {iteration}")]
    Cancelled { id: TaskId, iteration: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submission validation errors, one message per offending field.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("validation error: {}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

impl ValidationError {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            fields: vec![message.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_joins_fields() {
        let err = ValidationError {
            fields: vec![
                "field n is required".to_string(),
                "field I is not valid".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "validation error: field n is required, field I is not valid"
        );
    }

    #[test]
    fn transition_error_names_states() {
        let err = StoreError::InvalidTransition {
            id: 7,
            from: TaskStatus::Completed,
            to: TaskStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "task 7 is completed, cannot transition to in progress"
        );
    }
}
