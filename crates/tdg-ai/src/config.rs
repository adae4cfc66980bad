//! Backend configuration

use crate::options::Speed;
use serde::{Deserialize, Serialize};

/// OpenAI chat completions endpoint
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Anthropic messages endpoint
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

/// Model names per speed tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTiers {
    /// Model for [`Speed::Fast`]
    pub fast: String,
    /// Model for [`Speed::Balanced`]
    pub balanced: String,
    /// Model for [`Speed::Quality`]
    pub quality: String,
}

impl ModelTiers {
    /// Tiers from three model names
    #[must_use]
    pub fn new(fast: &str, balanced: &str, quality: &str) -> Self {
        Self {
            fast: fast.to_string(),
            balanced: balanced.to_string(),
            quality: quality.to_string(),
        }
    }

    /// Model for `speed`
    #[inline]
    #[must_use]
    pub fn for_speed(&self, speed: Speed) -> &str {
        match speed {
            Speed::Fast => &self.fast,
            Speed::Balanced => &self.balanced,
            Speed::Quality => &self.quality,
        }
    }
}

/// How a backend ranks for speed-based selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// Lower answers sooner
    pub latency: u8,
    /// Higher produces better cases
    pub fidelity: u8,
}

/// Sampling settings for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
}

/// Configuration for external backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// OpenAI API key; the backend is unavailable without it
    pub openai_api_key: Option<String>,
    /// Anthropic API key; the backend is unavailable without it
    pub anthropic_api_key: Option<String>,
    /// OpenAI endpoint URL
    pub openai_endpoint: String,
    /// Anthropic endpoint URL
    pub anthropic_endpoint: String,
    /// OpenAI models per tier
    pub openai_models: ModelTiers,
    /// Anthropic models per tier
    pub anthropic_models: ModelTiers,
    /// OpenAI selection profile
    pub openai_profile: BackendProfile,
    /// Anthropic selection profile
    pub anthropic_profile: BackendProfile,
    /// Temperature for balanced requests
    pub temperature: f32,
    /// Token cap for balanced requests
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Provider used for balanced requests that name none
    pub default_provider: Option<String>,
    /// Wrap auto-selected backends in the hybrid provider
    pub hybrid_enhancement: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            anthropic_endpoint: DEFAULT_ANTHROPIC_ENDPOINT.to_string(),
            openai_models: ModelTiers::new("gpt-4o-mini", "gpt-4o-mini", "gpt-4o"),
            anthropic_models: ModelTiers::new(
                "claude-3-haiku-20240307",
                "claude-3-haiku-20240307",
                "claude-3-5-sonnet-20241022",
            ),
            openai_profile: BackendProfile {
                latency: 1,
                fidelity: 2,
            },
            anthropic_profile: BackendProfile {
                latency: 2,
                fidelity: 1,
            },
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 60,
            default_provider: None,
            hybrid_enhancement: false,
        }
    }
}

impl AiConfig {
    /// Set the OpenAI key
    #[inline]
    #[must_use]
    pub fn with_openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set the Anthropic key
    #[inline]
    #[must_use]
    pub fn with_anthropic_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = Some(key.into());
        self
    }

    /// Set the request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the default provider
    #[inline]
    #[must_use]
    pub fn with_default_provider(mut self, provider: impl Into<String>) -> Self {
        self.default_provider = Some(provider.into());
        self
    }

    /// Enable or disable hybrid wrapping
    #[inline]
    #[must_use]
    pub fn with_hybrid_enhancement(mut self, enabled: bool) -> Self {
        self.hybrid_enhancement = enabled;
        self
    }

    /// Sampling for a full generation request.
    ///
    /// Fast requests get a larger budget for POST bodies.
    #[must_use]
    pub fn sampling(&self, speed: Speed, rich_body: bool) -> Sampling {
        match speed {
            Speed::Fast => Sampling {
                temperature: 0.5,
                max_tokens: if rich_body { 2000 } else { 1000 },
            },
            Speed::Balanced => Sampling {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            Speed::Quality => Sampling {
                temperature: 0.7,
                max_tokens: 3000,
            },
        }
    }

    /// Sampling for a hybrid enhancement request
    #[inline]
    #[must_use]
    pub fn enhancement_sampling(&self) -> Sampling {
        Sampling {
            temperature: 0.3,
            max_tokens: 1500,
        }
    }
}

/// Non-empty key, ignoring blank strings from the environment
pub(crate) fn usable_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}
