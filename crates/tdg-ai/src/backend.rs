//! Completion backends
//!
//! A [`CompletionBackend`] turns a prompt into raw model text. Parsing,
//! repair and fallback live above this layer.

use crate::config::{AiConfig, BackendProfile, ModelTiers};
use crate::error::GenerationProviderError;
use crate::options::Speed;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Longest error body kept in [`GenerationProviderError::BadStatus`]
const ERROR_BODY_LIMIT: usize = 320;

/// Backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl BackendKind {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction
    pub system: String,
    /// User prompt
    pub prompt: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Ask for a JSON object response where supported
    pub json_mode: bool,
}

/// Something that completes prompts
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend family
    fn kind(&self) -> BackendKind;

    /// Selection profile
    fn profile(&self) -> BackendProfile;

    /// Model used for `speed`
    fn model_for(&self, speed: Speed) -> String;

    /// Complete `request`, returning the raw text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationProviderError>;
}

fn build_client(backend: BackendKind, timeout_secs: u64) -> Result<Client, GenerationProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GenerationProviderError::Transport {
            backend: backend.as_str().to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

async fn check_status(
    backend: BackendKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GenerationProviderError::BadStatus {
        backend: backend.as_str().to_string(),
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// OpenAI chat completions backend
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    endpoint: String,
    models: ModelTiers,
    profile: BackendProfile,
    timeout_secs: u64,
}

impl OpenAiBackend {
    /// Backend with its own short-lived client
    ///
    /// # Errors
    ///
    /// Returns [`GenerationProviderError::Transport`] if the HTTP client
    /// cannot be built.
    pub fn new(api_key: impl Into<String>, config: &AiConfig) -> Result<Self, GenerationProviderError> {
        Ok(Self {
            client: build_client(BackendKind::OpenAi, config.timeout_secs)?,
            api_key: api_key.into(),
            endpoint: config.openai_endpoint.clone(),
            models: config.openai_models.clone(),
            profile: config.openai_profile,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    fn profile(&self) -> BackendProfile {
        self.profile
    }

    fn model_for(&self, speed: Speed) -> String {
        self.models.for_speed(speed).to_string()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationProviderError> {
        let mut payload = json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            payload["response_format"] = json!({"type": "json_object"});
        }

        tracing::debug!(backend = "openai", model = %request.model, "sending completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationProviderError::from_transport("openai", self.timeout_secs, &e))?;
        let response = check_status(BackendKind::OpenAi, response).await?;

        let body: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| GenerationProviderError::from_transport("openai", self.timeout_secs, &e))?;
        body.choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationProviderError::EmptyResponse {
                backend: "openai".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

/// Anthropic messages backend
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    endpoint: String,
    models: ModelTiers,
    profile: BackendProfile,
    timeout_secs: u64,
}

impl AnthropicBackend {
    /// Backend with its own short-lived client
    ///
    /// # Errors
    ///
    /// Returns [`GenerationProviderError::Transport`] if the HTTP client
    /// cannot be built.
    pub fn new(api_key: impl Into<String>, config: &AiConfig) -> Result<Self, GenerationProviderError> {
        Ok(Self {
            client: build_client(BackendKind::Anthropic, config.timeout_secs)?,
            api_key: api_key.into(),
            endpoint: config.anthropic_endpoint.clone(),
            models: config.anthropic_models.clone(),
            profile: config.anthropic_profile,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn profile(&self) -> BackendProfile {
        self.profile
    }

    fn model_for(&self, speed: Speed) -> String {
        self.models.for_speed(speed).to_string()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationProviderError> {
        let payload = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        tracing::debug!(backend = "anthropic", model = %request.model, "sending completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationProviderError::from_transport("anthropic", self.timeout_secs, &e))?;
        let response = check_status(BackendKind::Anthropic, response).await?;

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| GenerationProviderError::from_transport("anthropic", self.timeout_secs, &e))?;
        let text = body
            .content
            .iter()
            .filter(|part| part.content_type == "text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(GenerationProviderError::EmptyResponse {
                backend: "anthropic".to_string(),
            });
        }
        Ok(text)
    }
}
