//! Error types for configuration and generation

use std::path::PathBuf;
use tdg_scheduler::{SchedulerError, TaskExecutionError};
use tdg_schema::SchemaResolutionError;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or type mismatch
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment variable with an unusable value
    #[error("invalid value '{value}' for {var}")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },

    /// Semantically invalid setting
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Tracing subscriber could not be installed
    #[error("failed to initialise tracing: {0}")]
    Tracing(String),
}

/// Errors surfaced by a generation request
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Document could not be resolved
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),

    /// Scheduler rejected or lost the task
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Task ended in FAILED
    #[error(transparent)]
    Task(#[from] TaskExecutionError),

    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Packaging hook failed
    #[error("packaging failed: {0}")]
    Packaging(String),
}

impl GenerationError {
    /// Whether the task is unknown or already purged
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Scheduler(err) if err.is_not_found())
    }

    /// Whether the request was rejected for capacity
    #[inline]
    #[must_use]
    pub fn is_queue_full(&self) -> bool {
        matches!(self, Self::Scheduler(err) if err.is_queue_full())
    }
}
