//! Generator configuration
//!
//! Loaded from TOML, then overlaid with environment variables:
//!
//! | Variable | Setting |
//! |---|---|
//! | `OPENAI_API_KEY` | `ai.openai_api_key` |
//! | `ANTHROPIC_API_KEY` | `ai.anthropic_api_key` |
//! | `GENERATION_WORKERS` | `workers` |
//! | `GENERATION_QUEUE_SIZE` | `queue_capacity` |
//! | `TDG_RETENTION_SECS` | `retention_secs` |
//! | `AI_TIMEOUT` | `ai.timeout_secs` |
//! | `TDG_LOG_LEVEL` | `log_level` |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tdg_ai::{AiConfig, MAX_CASES, MIN_CASES};
use tdg_scheduler::SchedulerConfig;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Concurrent generation workers
    pub workers: usize,
    /// Most queued requests
    pub queue_capacity: usize,
    /// Seconds terminal results stay queryable
    pub retention_secs: u64,
    /// Cases per endpoint when a request names none
    pub default_cases_per_endpoint: usize,
    /// Upper bound on cases per endpoint
    pub max_cases_per_endpoint: usize,
    /// Default tracing filter
    pub log_level: String,
    /// External backend settings
    pub ai: AiConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 100,
            retention_secs: 3600,
            default_cases_per_endpoint: 10,
            max_cases_per_endpoint: MAX_CASES,
            log_level: "info".to_string(),
            ai: AiConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when unreadable, [`ConfigError::Parse`] when
    /// malformed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Overlay the process environment
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEnv`] for unparsable numeric values.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Overlay variables from `lookup`
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEnv`] for unparsable numeric values.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.ai.anthropic_api_key = Some(key);
        }
        if let Some(level) = get("TDG_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(value) = get("GENERATION_WORKERS") {
            self.workers = parse_env("GENERATION_WORKERS", &value)?;
        }
        if let Some(value) = get("GENERATION_QUEUE_SIZE") {
            self.queue_capacity = parse_env("GENERATION_QUEUE_SIZE", &value)?;
        }
        if let Some(value) = get("TDG_RETENTION_SECS") {
            self.retention_secs = parse_env("TDG_RETENTION_SECS", &value)?;
        }
        if let Some(value) = get("AI_TIMEOUT") {
            self.ai.timeout_secs = parse_env("AI_TIMEOUT", &value)?;
        }
        Ok(self)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        if !(MIN_CASES..=MAX_CASES).contains(&self.max_cases_per_endpoint) {
            return Err(ConfigError::Invalid(format!(
                "max_cases_per_endpoint must be within {MIN_CASES}..={MAX_CASES}"
            )));
        }
        if !(MIN_CASES..=self.max_cases_per_endpoint).contains(&self.default_cases_per_endpoint) {
            return Err(ConfigError::Invalid(format!(
                "default_cases_per_endpoint must be within {MIN_CASES}..={}",
                self.max_cases_per_endpoint
            )));
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::Invalid("ai.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Scheduler sizing derived from this configuration
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_retention(Duration::from_secs(self.retention_secs))
    }

    /// With worker count
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// With queue capacity
    #[inline]
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// With retention window
    #[inline]
    #[must_use]
    pub fn with_retention_secs(mut self, secs: u64) -> Self {
        self.retention_secs = secs;
        self
    }

    /// With backend settings
    #[inline]
    #[must_use]
    pub fn with_ai(mut self, ai: AiConfig) -> Self {
        self.ai = ai;
        self
    }
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}
