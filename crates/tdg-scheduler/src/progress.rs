//! Progress events and sinks
//!
//! Runners report stage boundaries through an injected [`ProgressSink`].
//! Sinks are synchronous and must not block; [`ChannelSink`] forwards to an
//! unbounded channel for consumers that push events elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Stage of a generation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    /// Resolving the document
    Parsing,
    /// Generating cases per endpoint
    Generating,
    /// Packaging output
    Zipping,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Error,
}

impl ProgressStage {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsing => "parsing",
            Self::Generating => "generating",
            Self::Zipping => "zipping",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Current stage
    pub stage: ProgressStage,
    /// Percent within the stage, 0..=100
    pub progress: u8,
    /// Human-readable message
    pub message: String,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
    /// Endpoints in the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_count: Option<usize>,
    /// Endpoint being generated, as `METHOD /path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_endpoint: Option<String>,
    /// Task the event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl ProgressEvent {
    /// Event stamped now; `progress` is clamped to 100
    #[must_use]
    pub fn new(stage: ProgressStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            message: message.into(),
            timestamp: Utc::now(),
            endpoint_count: None,
            current_endpoint: None,
            task_id: None,
        }
    }

    /// Failure event at progress 0
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ProgressStage::Error, 0, message)
    }

    /// Attach the endpoint count
    #[inline]
    #[must_use]
    pub fn with_endpoint_count(mut self, count: usize) -> Self {
        self.endpoint_count = Some(count);
        self
    }

    /// Attach the current endpoint
    #[inline]
    #[must_use]
    pub fn with_current_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.current_endpoint = Some(endpoint.into());
        self
    }

    /// Attach the task id
    #[inline]
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// Receives progress events
pub trait ProgressSink: Send + Sync {
    /// Deliver one event; must not block
    fn emit(&self, event: ProgressEvent);
}

/// Discards events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Writes events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl ProgressSink for LoggingSink {
    fn emit(&self, event: ProgressEvent) {
        let task_id = event.task_id.as_deref().unwrap_or("-");
        let endpoint = event.current_endpoint.as_deref().unwrap_or("-");
        if event.stage == ProgressStage::Error {
            tracing::warn!(task_id, stage = %event.stage, "{}", event.message);
        } else {
            tracing::info!(
                task_id,
                stage = %event.stage,
                progress = event.progress,
                endpoint,
                "{}",
                event.message
            );
        }
    }
}

/// Forwards events to a channel; events are dropped once the receiver closes
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Sink and the receiving half
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("progress receiver closed");
        }
    }
}

/// Stamps a task id on every event before forwarding
pub struct TaskSink<'a> {
    task_id: String,
    inner: &'a dyn ProgressSink,
}

impl<'a> TaskSink<'a> {
    /// Wrap `inner` for `task_id`
    #[must_use]
    pub fn new(task_id: impl Into<String>, inner: &'a dyn ProgressSink) -> Self {
        Self {
            task_id: task_id.into(),
            inner,
        }
    }
}

impl ProgressSink for TaskSink<'_> {
    fn emit(&self, event: ProgressEvent) {
        let event = if event.task_id.is_some() {
            event
        } else {
            event.with_task_id(self.task_id.clone())
        };
        self.inner.emit(event);
    }
}
