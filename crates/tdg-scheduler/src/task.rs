//! Task identity, priority and lifecycle

use crate::error::{SchedulerError, TaskExecutionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique, time-ordered task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Ulid);

impl TaskId {
    /// Fresh identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Dispatch priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Dispatched first
    High,
    /// Default priority
    #[default]
    Normal,
    /// Dispatched last
    Low,
}

impl Priority {
    /// Sort rank, lower dispatches first
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Waiting for a worker
    Queued,
    /// Held by a worker
    Running,
    /// Finished with output
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskState {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: TaskState) -> &'static [TaskState] {
    use TaskState::{Completed, Failed, Queued, Running};
    match from {
        // Queued tasks fail directly when abandoned at shutdown
        Queued => &[Running, Failed],
        Running => &[Completed, Failed],
        Completed | Failed => &[],
    }
}

/// Validate a state transition
///
/// # Errors
///
/// [`SchedulerError::IllegalTransition`] when `to` is not reachable from
/// `from`.
pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), SchedulerError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SchedulerError::IllegalTransition { from, to })
    }
}

/// Observable task status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier
    pub id: TaskId,
    /// Dispatch priority
    pub priority: Priority,
    /// Submission sequence, unique and increasing
    pub sequence: u64,
    /// Current state
    pub state: TaskState,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
    /// Dispatch time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure, for [`TaskState::Failed`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskExecutionError>,
}

impl TaskRecord {
    pub(crate) fn queued(id: TaskId, priority: Priority, sequence: u64) -> Self {
        Self {
            id,
            priority,
            sequence,
            state: TaskState::Queued,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Move to `to`, stamping times
    ///
    /// # Errors
    ///
    /// [`SchedulerError::IllegalTransition`] for a disallowed move.
    pub fn transition(&mut self, to: TaskState) -> Result<(), SchedulerError> {
        validate_transition(self.state, to)?;
        match to {
            TaskState::Running => self.started_at = Some(Utc::now()),
            TaskState::Completed | TaskState::Failed => self.finished_at = Some(Utc::now()),
            TaskState::Queued => {}
        }
        self.state = to;
        Ok(())
    }
}

/// Terminal task result
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome<O> {
    /// Final status
    pub record: TaskRecord,
    /// Runner output or failure
    pub output: Result<O, TaskExecutionError>,
}

impl<O> TaskOutcome<O> {
    /// Whether the task completed
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.output.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lifecycle() {
        let mut record = TaskRecord::queued(TaskId::new(), Priority::High, 0);
        record.transition(TaskState::Running).unwrap();
        assert!(record.started_at.is_some());
        record.transition(TaskState::Completed).unwrap();
        assert!(record.state.is_terminal());
        let err = record.transition(TaskState::Running).unwrap_err();
        assert!(matches!(err, SchedulerError::IllegalTransition { .. }));
    }

    #[test]
    fn test_no_reentry() {
        assert!(validate_transition(TaskState::Running, TaskState::Queued).is_err());
        assert!(validate_transition(TaskState::Queued, TaskState::Completed).is_err());
        assert!(validate_transition(TaskState::Failed, TaskState::Completed).is_err());
    }

    #[test]
    fn test_ids_and_names() {
        let id = TaskId::new();
        assert_eq!(id.to_string().parse::<TaskId>().unwrap(), id);
        assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
        assert!(Priority::High.rank() < Priority::Normal.rank());
        assert_eq!(
            serde_json::to_value(TaskState::Completed).unwrap(),
            serde_json::json!("COMPLETED")
        );
    }
}
