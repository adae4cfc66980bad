//! TDG Scheduler - priority scheduling for generation tasks
//!
//! - [`TaskQueue`]: bounded queue ordered by priority, then submission
//! - [`GenerationScheduler`]: fixed worker pool draining the queue, with
//!   per-task state tracking and time-limited result retention
//! - [`ProgressSink`]: injected receiver for [`ProgressEvent`]s
//!
//! Tasks move through `QUEUED -> RUNNING -> COMPLETED | FAILED`; see
//! [`validate_transition`].

#![warn(unreachable_pub)]

pub mod error;
pub mod progress;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use error::{QueueFullError, SchedulerError, TaskExecutionError};
pub use progress::{ChannelSink, LoggingSink, NoopSink, ProgressEvent, ProgressSink, ProgressStage, TaskSink};
pub use queue::TaskQueue;
pub use scheduler::{GenerationScheduler, SchedulerConfig, SchedulerStats, TaskRunner};
pub use task::{allowed_transitions, validate_transition, Priority, TaskId, TaskOutcome, TaskRecord, TaskState};
