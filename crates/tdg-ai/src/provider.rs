//! Case providers
//!
//! Every provider answers [`CaseProvider::generate_cases`] without failing.
//! [`CaseProvider::attempt`] exposes the failure so the orchestrator can
//! substitute the next provider instead of falling back immediately.

use crate::backend::{BackendKind, CompletionBackend, CompletionRequest};
use crate::config::AiConfig;
use crate::error::GenerationProviderError;
use crate::options::{GenerationOptions, Speed};
use crate::prompts::{enhancement_prompt, generation_prompt, SYSTEM_PROMPT};
use crate::response::{conform_cases, decode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tdg_repair::JsonRepairEngine;
use tdg_schema::{Endpoint, HttpMethod};
use tdg_synth::{seeded_rng, CaseAssembler, SchemaSynthesizer, TestCase};

/// Most cases a hybrid enhancement may append
pub const MAX_ENHANCEMENTS: usize = 3;

/// Provider family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Schema-driven assembly, no network
    Deterministic,
    /// OpenAI backend
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic backend
    Anthropic,
    /// Deterministic foundation plus external enhancement
    Hybrid,
}

impl ProviderKind {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parse a provider name, case-insensitively
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "deterministic" | "null" | "none" => Some(Self::Deterministic),
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Backend this kind talks to, if any
    #[must_use]
    pub fn backend(self) -> Option<BackendKind> {
        match self {
            Self::OpenAi => Some(BackendKind::OpenAi),
            Self::Anthropic => Some(BackendKind::Anthropic),
            Self::Deterministic | Self::Hybrid => None,
        }
    }
}

impl From<BackendKind> for ProviderKind {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::OpenAi => Self::OpenAi,
            BackendKind::Anthropic => Self::Anthropic,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that produces test cases for an endpoint
#[async_trait]
pub trait CaseProvider: Send + Sync {
    /// Provider family
    fn kind(&self) -> ProviderKind;

    /// Whether the provider can be tried at all
    fn is_available(&self) -> bool;

    /// One generation attempt, surfacing failure
    async fn attempt(
        &self,
        endpoint: &Endpoint,
        options: &GenerationOptions,
    ) -> Result<Vec<TestCase>, GenerationProviderError>;

    /// Generate cases, substituting deterministic output on any failure
    async fn generate_cases(&self, endpoint: &Endpoint, options: &GenerationOptions) -> Vec<TestCase> {
        match self.attempt(endpoint, options).await {
            Ok(cases) => cases,
            Err(error) => {
                tracing::warn!(
                    provider = self.kind().as_str(),
                    endpoint = %endpoint.label(),
                    task_id = options.task_id.as_deref().unwrap_or("-"),
                    %error,
                    "provider failed, using deterministic cases"
                );
                DeterministicProvider::default().assemble(endpoint, options)
            }
        }
    }
}

/// Schema-driven provider; never fails
#[derive(Debug, Clone, Default)]
pub struct DeterministicProvider {
    assembler: CaseAssembler,
}

impl DeterministicProvider {
    /// Provider drawing values from `synthesizer`
    #[must_use]
    pub fn new(synthesizer: Arc<SchemaSynthesizer>) -> Self {
        Self {
            assembler: CaseAssembler::new(synthesizer),
        }
    }

    /// Assemble cases for `endpoint`
    #[must_use]
    pub fn assemble(&self, endpoint: &Endpoint, options: &GenerationOptions) -> Vec<TestCase> {
        self.assembler
            .assemble(endpoint, options.case_count(), options.domain(), options.seed)
    }
}

#[async_trait]
impl CaseProvider for DeterministicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Deterministic
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        options: &GenerationOptions,
    ) -> Result<Vec<TestCase>, GenerationProviderError> {
        Ok(self.assemble(endpoint, options))
    }
}

/// Provider backed by a language model
#[derive(Clone)]
pub struct ExternalProvider {
    backend: Arc<dyn CompletionBackend>,
    config: AiConfig,
    engine: JsonRepairEngine,
    synthesizer: Arc<SchemaSynthesizer>,
}

impl fmt::Debug for ExternalProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalProvider")
            .field("backend", &self.backend.kind())
            .finish_non_exhaustive()
    }
}

impl ExternalProvider {
    /// Provider completing through `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>, config: AiConfig, synthesizer: Arc<SchemaSynthesizer>) -> Self {
        Self {
            backend,
            config,
            engine: JsonRepairEngine::default(),
            synthesizer,
        }
    }

    /// Backend family
    #[inline]
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationProviderError> {
        self.backend.complete(&request).await
    }

    fn finish(
        &self,
        text: &str,
        endpoint: &Endpoint,
        options: &GenerationOptions,
    ) -> Result<Vec<TestCase>, GenerationProviderError> {
        let cases = decode(text, &self.engine, endpoint, self.backend.kind().as_str())?;
        let mut rng = seeded_rng(options.seed);
        Ok(conform_cases(
            cases,
            endpoint,
            &self.synthesizer,
            options.domain(),
            &mut rng,
        ))
    }

    /// Ask for 2-3 cases extending `foundation`
    ///
    /// # Errors
    ///
    /// Any backend or decoding failure.
    pub async fn enhance(
        &self,
        endpoint: &Endpoint,
        foundation: &[TestCase],
        options: &GenerationOptions,
    ) -> Result<Vec<TestCase>, GenerationProviderError> {
        let sampling = self.config.enhancement_sampling();
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: enhancement_prompt(endpoint, foundation, options.domain()),
            model: self.backend.model_for(Speed::Fast),
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            json_mode: false,
        };
        let text = self.complete(request).await?;
        let mut cases = self.finish(&text, endpoint, options)?;
        cases.truncate(MAX_ENHANCEMENTS);
        Ok(cases)
    }
}

#[async_trait]
impl CaseProvider for ExternalProvider {
    fn kind(&self) -> ProviderKind {
        self.backend.kind().into()
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        options: &GenerationOptions,
    ) -> Result<Vec<TestCase>, GenerationProviderError> {
        let sampling = self
            .config
            .sampling(options.speed, endpoint.method == HttpMethod::Post);
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: generation_prompt(endpoint, options),
            model: self.backend.model_for(options.speed),
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            json_mode: true,
        };
        let text = self.complete(request).await?;
        let mut cases = self.finish(&text, endpoint, options)?;
        cases.truncate(options.case_count());
        Ok(cases)
    }
}

/// Deterministic foundation, optionally extended by a model
#[derive(Debug, Clone, Default)]
pub struct HybridProvider {
    foundation: DeterministicProvider,
    enhancer: Option<ExternalProvider>,
}

impl HybridProvider {
    /// Hybrid over `foundation`, enhanced by `enhancer` when present
    #[must_use]
    pub fn new(foundation: DeterministicProvider, enhancer: Option<ExternalProvider>) -> Self {
        Self { foundation, enhancer }
    }

    /// Whether a model is attached
    #[inline]
    #[must_use]
    pub fn is_enhanced(&self) -> bool {
        self.enhancer.is_some()
    }
}

#[async_trait]
impl CaseProvider for HybridProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Hybrid
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        options: &GenerationOptions,
    ) -> Result<Vec<TestCase>, GenerationProviderError> {
        let mut cases = self.foundation.assemble(endpoint, options);
        let Some(enhancer) = &self.enhancer else {
            return Ok(cases);
        };
        match enhancer.enhance(endpoint, &cases, options).await {
            Ok(extra) => {
                tracing::debug!(
                    endpoint = %endpoint.label(),
                    foundation = cases.len(),
                    added = extra.len(),
                    "enhanced foundation cases"
                );
                cases.extend(extra);
            }
            Err(error) => {
                tracing::warn!(
                    provider = enhancer.backend_kind().as_str(),
                    endpoint = %endpoint.label(),
                    %error,
                    "enhancement failed, keeping foundation cases"
                );
            }
        }
        Ok(cases)
    }
}
