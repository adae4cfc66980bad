//! Provider selection and substitution
//!
//! [`AiOrchestrator`] turns [`GenerationOptions`] into a [`ProviderChain`]:
//! the selected provider first, then any other external backend, then the
//! deterministic provider. Each provider gets one attempt; the chain always
//! ends in a provider that cannot fail.

use crate::backend::CompletionBackend;
use crate::config::AiConfig;
use crate::factory::{configured_backends, deterministic_provider, external_provider, hybrid_provider};
use crate::options::{GenerationOptions, Speed};
use crate::provider::{CaseProvider, ProviderKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tdg_schema::Endpoint;
use tdg_synth::{SchemaSynthesizer, TestCase};

/// Cases with the provider that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCases {
    /// Generated cases
    pub cases: Vec<TestCase>,
    /// Provider that succeeded
    pub provider: ProviderKind,
}

/// Ordered providers for one session
pub struct ProviderChain {
    providers: Vec<Box<dyn CaseProvider>>,
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

impl ProviderChain {
    /// Provider kinds in attempt order
    #[must_use]
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Provider tried first
    #[must_use]
    pub fn primary(&self) -> ProviderKind {
        self.providers
            .first()
            .map_or(ProviderKind::Deterministic, |p| p.kind())
    }

    /// Try each provider once, in order
    pub async fn generate(&self, endpoint: &Endpoint, options: &GenerationOptions) -> GeneratedCases {
        let task_id = options.task_id.as_deref().unwrap_or("-");
        for provider in self.providers.iter().filter(|p| p.is_available()) {
            let kind = provider.kind();
            match provider.attempt(endpoint, options).await {
                Ok(cases) if cases.is_empty() && kind != ProviderKind::Deterministic => {
                    tracing::warn!(
                        provider = kind.as_str(),
                        endpoint = %endpoint.label(),
                        task_id,
                        "provider returned no cases, trying next"
                    );
                }
                Ok(cases) => {
                    tracing::debug!(
                        provider = kind.as_str(),
                        endpoint = %endpoint.label(),
                        task_id,
                        cases = cases.len(),
                        "generated cases"
                    );
                    return GeneratedCases { cases, provider: kind };
                }
                Err(error) => {
                    tracing::warn!(
                        provider = kind.as_str(),
                        endpoint = %endpoint.label(),
                        task_id,
                        retryable = error.is_retryable(),
                        %error,
                        "provider failed, trying next"
                    );
                }
            }
        }
        GeneratedCases {
            cases: Vec::new(),
            provider: ProviderKind::Deterministic,
        }
    }
}

/// Chooses and runs providers
pub struct AiOrchestrator {
    config: AiConfig,
    backends: Option<Vec<Arc<dyn CompletionBackend>>>,
    synthesizer: Arc<SchemaSynthesizer>,
}

impl fmt::Debug for AiOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiOrchestrator")
            .field("injected_backends", &self.backends.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

impl Default for AiOrchestrator {
    fn default() -> Self {
        Self::new(AiConfig::default())
    }
}

impl AiOrchestrator {
    /// Orchestrator building its backends from `config` each session
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            backends: None,
            synthesizer: Arc::new(SchemaSynthesizer::default()),
        }
    }

    /// Orchestrator over a fixed backend list
    #[must_use]
    pub fn with_backends(config: AiConfig, backends: Vec<Arc<dyn CompletionBackend>>) -> Self {
        Self {
            backends: Some(backends),
            ..Self::new(config)
        }
    }

    /// Orchestrator that never leaves the process
    #[must_use]
    pub fn deterministic_only() -> Self {
        Self::with_backends(AiConfig::default(), Vec::new())
    }

    /// Share a synthesizer with other components
    #[inline]
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Arc<SchemaSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Synthesizer behind the deterministic providers
    #[inline]
    #[must_use]
    pub fn synthesizer(&self) -> &Arc<SchemaSynthesizer> {
        &self.synthesizer
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    fn session_backends(&self) -> Vec<Arc<dyn CompletionBackend>> {
        self.backends
            .clone()
            .unwrap_or_else(|| configured_backends(&self.config))
    }

    /// Provider names this orchestrator could use right now
    #[must_use]
    pub fn available_providers(&self) -> Vec<ProviderKind> {
        let mut kinds = vec![ProviderKind::Deterministic];
        let backends = self.session_backends();
        kinds.extend(backends.iter().map(|b| ProviderKind::from(b.kind())));
        if !backends.is_empty() {
            kinds.push(ProviderKind::Hybrid);
        }
        kinds
    }

    /// Select providers for a session
    #[must_use]
    pub fn provider_chain(&self, options: &GenerationOptions) -> ProviderChain {
        let backends = self.session_backends();
        let requested = options
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                (options.speed == Speed::Balanced)
                    .then(|| self.config.default_provider.clone())
                    .flatten()
            });

        let mut providers: Vec<Box<dyn CaseProvider>> = Vec::with_capacity(backends.len() + 1);
        let mut primary_backend = None;

        match requested.as_deref().map(|name| (name, ProviderKind::parse(name))) {
            Some((_, Some(ProviderKind::Deterministic))) => {}
            Some((_, Some(ProviderKind::Hybrid))) => {
                let enhancer = select_auto(&backends, options.speed);
                providers.push(Box::new(hybrid_provider(enhancer, &self.config, &self.synthesizer)));
            }
            Some((name, Some(kind))) => {
                let wanted = kind.backend();
                match backends.iter().find(|b| Some(b.kind()) == wanted) {
                    Some(backend) => primary_backend = Some(Arc::clone(backend)),
                    None => tracing::warn!(provider = name, "requested provider is not configured"),
                }
            }
            Some((name, None)) => {
                tracing::warn!(provider = name, "unknown provider, using deterministic");
            }
            None => match select_auto(&backends, options.speed) {
                Some(backend) if self.config.hybrid_enhancement => {
                    providers.push(Box::new(hybrid_provider(
                        Some(backend),
                        &self.config,
                        &self.synthesizer,
                    )));
                }
                Some(backend) => primary_backend = Some(backend),
                None => {}
            },
        }

        if let Some(primary) = primary_backend {
            let primary_kind = primary.kind();
            providers.push(Box::new(external_provider(primary, &self.config, &self.synthesizer)));
            for backend in backends.into_iter().filter(|b| b.kind() != primary_kind) {
                providers.push(Box::new(external_provider(backend, &self.config, &self.synthesizer)));
            }
        }
        providers.push(Box::new(deterministic_provider(&self.synthesizer)));

        let chain = ProviderChain { providers };
        tracing::debug!(
            chain = ?chain.kinds(),
            speed = options.speed.as_str(),
            task_id = options.task_id.as_deref().unwrap_or("-"),
            "selected providers"
        );
        chain
    }

    /// Generate cases for one endpoint; never fails
    pub async fn generate_cases(&self, endpoint: &Endpoint, options: &GenerationOptions) -> GeneratedCases {
        self.provider_chain(options).generate(endpoint, options).await
    }
}

/// Backend for speed-based selection
fn select_auto(backends: &[Arc<dyn CompletionBackend>], speed: Speed) -> Option<Arc<dyn CompletionBackend>> {
    let chosen = match speed {
        Speed::Fast => backends.iter().min_by_key(|b| b.profile().latency),
        Speed::Quality => backends.iter().max_by_key(|b| b.profile().fidelity),
        Speed::Balanced => backends.first(),
    };
    chosen.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tdg_schema::HttpMethod;

    #[test]
    fn test_nothing_configured_is_deterministic() {
        let orchestrator = AiOrchestrator::deterministic_only();
        for speed in [Speed::Fast, Speed::Balanced, Speed::Quality] {
            let chain = orchestrator.provider_chain(&GenerationOptions::default().with_speed(speed));
            assert_eq!(chain.kinds(), vec![ProviderKind::Deterministic]);
        }
        let chain = orchestrator.provider_chain(&GenerationOptions::default().with_provider("openai"));
        assert_eq!(chain.primary(), ProviderKind::Deterministic);
    }

    #[test]
    fn test_hybrid_without_backends() {
        let orchestrator = AiOrchestrator::deterministic_only();
        let chain = orchestrator.provider_chain(&GenerationOptions::default().with_provider("hybrid"));
        assert_eq!(chain.kinds(), vec![ProviderKind::Hybrid, ProviderKind::Deterministic]);
        assert_eq!(orchestrator.available_providers(), vec![ProviderKind::Deterministic]);
    }

    #[test]
    fn test_keys_enable_backends() {
        let config = AiConfig::default().with_openai_key("sk-test").with_anthropic_key("key");
        let orchestrator = AiOrchestrator::new(config);
        let chain = orchestrator.provider_chain(&GenerationOptions::default());
        assert_eq!(
            chain.kinds(),
            vec![ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Deterministic]
        );
        assert_eq!(orchestrator.available_providers().len(), 4);
    }

    #[tokio::test]
    async fn test_generate_without_backends() {
        let orchestrator = AiOrchestrator::deterministic_only();
        let endpoint = Endpoint::new(HttpMethod::Get, "/pets");
        let generated = orchestrator
            .generate_cases(&endpoint, &GenerationOptions::default().with_seed(5))
            .await;
        assert_eq!(generated.provider, ProviderKind::Deterministic);
        assert_eq!(generated.cases.len(), 10);
    }
}
