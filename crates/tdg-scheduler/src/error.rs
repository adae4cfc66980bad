//! Scheduler error types

use crate::task::{TaskId, TaskState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Submission rejected because the queue is at capacity.
///
/// The task was never admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("generation queue is full ({capacity} tasks)")]
pub struct QueueFullError {
    /// Configured queue capacity
    pub capacity: usize,
}

/// Terminal failure of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TaskExecutionError {
    /// Runner returned an error
    #[error("generation failed: {0}")]
    Failed(String),
    /// Runner panicked
    #[error("generation panicked: {0}")]
    Panicked(String),
    /// Scheduler shut down before the task ran
    #[error("scheduler shut down before the task ran")]
    Abandoned,
}

impl TaskExecutionError {
    /// Wrap any displayable error
    #[must_use]
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed(error.to_string())
    }
}

/// Scheduler operation errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Queue at capacity
    #[error(transparent)]
    QueueFull(#[from] QueueFullError),

    /// Unknown or purged task
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// Task did not finish in time
    #[error("task {task_id} still running after {waited:?}")]
    Timeout {
        /// Task waited on
        task_id: TaskId,
        /// How long the caller waited
        waited: Duration,
    },

    /// State machine violation
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: TaskState,
        /// Requested state
        to: TaskState,
    },

    /// Scheduler no longer accepts work
    #[error("scheduler is shut down")]
    ShutDown,
}

impl SchedulerError {
    /// Whether the task is unknown or already purged
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the submission was rejected for capacity
    #[inline]
    #[must_use]
    pub fn is_queue_full(&self) -> bool {
        matches!(self, Self::QueueFull(_))
    }
}
