//! Per-request generation options

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fewest cases per endpoint a request may ask for
pub const MIN_CASES: usize = 1;

/// Most cases per endpoint a request may ask for
pub const MAX_CASES: usize = 100;

/// Latency/fidelity trade-off when picking a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// Lowest-latency backend, small models
    #[default]
    Fast,
    /// The configured default backend
    Balanced,
    /// Highest-fidelity backend, large models
    Quality,
}

impl Speed {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Quality => "quality",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Speed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "quality" => Ok(Self::Quality),
            other => Err(format!("unknown speed '{other}' (expected fast, balanced or quality)")),
        }
    }
}

/// Options for one generation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Cases per endpoint, within [`MIN_CASES`]..=[`MAX_CASES`]
    pub count: usize,
    /// Business domain steering value choice and prompts
    pub domain_hint: Option<String>,
    /// Seed for reproducible deterministic output
    pub seed: Option<u64>,
    /// Backend selection preference
    pub speed: Speed,
    /// Explicit provider name (`deterministic`, `openai`, `anthropic`, `hybrid`)
    pub provider: Option<String>,
    /// Scheduler task this session runs under
    pub task_id: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            count: 10,
            domain_hint: None,
            seed: None,
            speed: Speed::default(),
            provider: None,
            task_id: None,
        }
    }
}

impl GenerationOptions {
    /// Set the case count, clamped into range
    #[inline]
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.clamp(MIN_CASES, MAX_CASES);
        self
    }

    /// Set the domain hint
    #[inline]
    #[must_use]
    pub fn with_domain_hint(mut self, hint: impl Into<String>) -> Self {
        self.domain_hint = Some(hint.into());
        self
    }

    /// Set the seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the speed preference
    #[inline]
    #[must_use]
    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Request a provider by name
    #[inline]
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attach a task id
    #[inline]
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Case count clamped into range, for options built by deserialization
    #[inline]
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.count.clamp(MIN_CASES, MAX_CASES)
    }

    /// Domain hint as a borrowed str
    #[inline]
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain_hint.as_deref()
    }

    /// Options for the endpoint at `index` within a session.
    ///
    /// The session seed is spread per endpoint so identically shaped
    /// endpoints draw different values; endpoint 0 keeps the seed as given.
    #[must_use]
    pub fn for_endpoint(&self, index: usize) -> Self {
        let mut options = self.clone();
        options.seed = self.seed.map(|seed| endpoint_seed(seed, index));
        options
    }
}

fn endpoint_seed(seed: u64, index: usize) -> u64 {
    const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
    let index = u64::try_from(index).unwrap_or(u64::MAX);
    seed.wrapping_add(index.wrapping_mul(GOLDEN))
}
