//! Backend and provider construction
//!
//! Clients are built per session from configuration; nothing is cached
//! process-wide.

use crate::backend::{AnthropicBackend, BackendKind, CompletionBackend, OpenAiBackend};
use crate::config::{usable_key, AiConfig};
use crate::provider::{DeterministicProvider, ExternalProvider, HybridProvider};
use std::sync::Arc;
use tdg_synth::SchemaSynthesizer;

/// Build the backend of `kind`, or `None` when it has no key
#[must_use]
pub fn build_backend(kind: BackendKind, config: &AiConfig) -> Option<Arc<dyn CompletionBackend>> {
    let built = match kind {
        BackendKind::OpenAi => {
            let key = usable_key(config.openai_api_key.as_deref())?;
            OpenAiBackend::new(key, config).map(|b| Arc::new(b) as Arc<dyn CompletionBackend>)
        }
        BackendKind::Anthropic => {
            let key = usable_key(config.anthropic_api_key.as_deref())?;
            AnthropicBackend::new(key, config).map(|b| Arc::new(b) as Arc<dyn CompletionBackend>)
        }
    };
    match built {
        Ok(backend) => Some(backend),
        Err(error) => {
            tracing::warn!(backend = kind.as_str(), %error, "skipping backend");
            None
        }
    }
}

/// Every backend `config` has keys for, OpenAI first
#[must_use]
pub fn configured_backends(config: &AiConfig) -> Vec<Arc<dyn CompletionBackend>> {
    [BackendKind::OpenAi, BackendKind::Anthropic]
        .into_iter()
        .filter_map(|kind| build_backend(kind, config))
        .collect()
}

/// Deterministic provider over `synthesizer`
#[must_use]
pub fn deterministic_provider(synthesizer: &Arc<SchemaSynthesizer>) -> DeterministicProvider {
    DeterministicProvider::new(Arc::clone(synthesizer))
}

/// External provider completing through `backend`
#[must_use]
pub fn external_provider(
    backend: Arc<dyn CompletionBackend>,
    config: &AiConfig,
    synthesizer: &Arc<SchemaSynthesizer>,
) -> ExternalProvider {
    ExternalProvider::new(backend, config.clone(), Arc::clone(synthesizer))
}

/// Hybrid provider, enhanced through `backend` when given
#[must_use]
pub fn hybrid_provider(
    backend: Option<Arc<dyn CompletionBackend>>,
    config: &AiConfig,
    synthesizer: &Arc<SchemaSynthesizer>,
) -> HybridProvider {
    HybridProvider::new(
        deterministic_provider(synthesizer),
        backend.map(|b| external_provider(b, config, synthesizer)),
    )
}
