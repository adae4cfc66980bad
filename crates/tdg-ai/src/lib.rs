//! TDG AI - provider orchestration for test case generation
//!
//! Generation is attempted through an ordered list of providers:
//!
//! - [`ExternalProvider`] asks a language model ([`OpenAiBackend`] or
//!   [`AnthropicBackend`]) and repairs whatever JSON comes back
//! - [`HybridProvider`] keeps a deterministic foundation and appends a few
//!   model-written cases
//! - [`DeterministicProvider`] assembles cases from the schema alone
//!
//! [`AiOrchestrator`] picks the first provider from [`GenerationOptions`]
//! and falls through the rest on failure. It never returns an error: the
//! deterministic provider always answers.
//!
//! # Example
//!
//! ```
//! use tdg_ai::{AiOrchestrator, GenerationOptions, ProviderKind};
//!
//! let orchestrator = AiOrchestrator::deterministic_only();
//! let chain = orchestrator.provider_chain(&GenerationOptions::default());
//! assert_eq!(chain.primary(), ProviderKind::Deterministic);
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod config;
pub mod error;
pub mod factory;
pub mod options;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod response;

pub use backend::{AnthropicBackend, BackendKind, CompletionBackend, CompletionRequest, OpenAiBackend};
pub use config::{AiConfig, BackendProfile, ModelTiers, Sampling};
pub use error::GenerationProviderError;
pub use options::{GenerationOptions, Speed, MAX_CASES, MIN_CASES};
pub use orchestrator::{AiOrchestrator, GeneratedCases, ProviderChain};
pub use provider::{CaseProvider, DeterministicProvider, ExternalProvider, HybridProvider, ProviderKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
