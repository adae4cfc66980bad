//! Provider selection, substitution and repair through the orchestrator

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tdg_ai::{
    AiConfig, AiOrchestrator, BackendKind, CompletionBackend, DeterministicProvider, GenerationOptions,
    ProviderKind, Speed,
};
use tdg_synth::{validates, TestType};
use tdg_test_utils::{create_pet_endpoint, create_pet_reply, Scripted, ScriptedBackend};

fn orchestrator(config: AiConfig, backends: &[Arc<ScriptedBackend>]) -> AiOrchestrator {
    let backends = backends
        .iter()
        .map(|b| Arc::clone(b) as Arc<dyn CompletionBackend>)
        .collect();
    AiOrchestrator::with_backends(config, backends)
}

fn options() -> GenerationOptions {
    GenerationOptions::default().with_seed(7).with_domain_hint("pet store")
}

/// Tenet: a failing backend never makes generation fail
#[tokio::test]
async fn test_failing_backend_falls_back() {
    let backend = Arc::new(ScriptedBackend::failing(BackendKind::OpenAi, 503));
    let orchestrator = orchestrator(AiConfig::default(), &[Arc::clone(&backend)]);
    let endpoint = create_pet_endpoint();

    let generated = orchestrator.generate_cases(&endpoint, &options()).await;

    assert_eq!(backend.calls(), 1);
    assert_eq!(generated.provider, ProviderKind::Deterministic);
    assert_eq!(
        generated.cases,
        DeterministicProvider::default().assemble(&endpoint, &options())
    );
}

/// Tenet: prose instead of JSON counts as a failed attempt
#[tokio::test]
async fn test_unparsable_reply_falls_back() {
    let backend = Arc::new(ScriptedBackend::replying(
        BackendKind::Anthropic,
        "I'm sorry, I can't produce test cases for that.",
    ));
    let orchestrator = orchestrator(AiConfig::default(), &[backend]);
    let generated = orchestrator
        .generate_cases(&create_pet_endpoint(), &options())
        .await;
    assert_eq!(generated.provider, ProviderKind::Deterministic);
    assert_eq!(generated.cases.len(), 10);
}

/// Tenet: each provider gets one attempt, in order
#[tokio::test]
async fn test_substitutes_next_backend() {
    let openai = Arc::new(ScriptedBackend::new(BackendKind::OpenAi, [Scripted::Timeout]));
    let anthropic = Arc::new(ScriptedBackend::replying(BackendKind::Anthropic, create_pet_reply()));
    let orchestrator = orchestrator(AiConfig::default(), &[Arc::clone(&openai), Arc::clone(&anthropic)]);

    let generated = orchestrator
        .generate_cases(&create_pet_endpoint(), &options())
        .await;

    assert_eq!(generated.provider, ProviderKind::Anthropic);
    assert_eq!((openai.calls(), anthropic.calls()), (1, 1));
    let names: Vec<_> = generated.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["create_dog", "create_without_name"]);
    assert_eq!(generated.cases[1].test_type, TestType::Negative);
    assert_eq!(generated.cases[1].expected_status, 400);
}

/// Tenet: truncated model output is repaired, not discarded
#[tokio::test]
async fn test_truncated_reply_is_repaired() {
    let reply = create_pet_reply();
    let cut = reply.find("create_without").expect("second case present");
    let truncated = format!("```json\n{}", &reply[..cut + 6]);
    let backend = Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, truncated));
    let orchestrator = orchestrator(AiConfig::default(), &[backend]);

    let generated = orchestrator
        .generate_cases(&create_pet_endpoint(), &options())
        .await;

    assert_eq!(generated.provider, ProviderKind::OpenAi);
    assert_eq!(generated.cases[0].name, "create_dog");
    assert_eq!(
        generated.cases[0].body,
        Some(json!({"name": "Buddy", "tag": "dog", "age": 3}))
    );
    assert_eq!(generated.cases[0].expected_status, 201);
}

/// Tenet: valid model-written bodies are coerced toward the request schema
#[tokio::test]
async fn test_valid_bodies_conform() {
    let reply = json!({"cases": [
        {"name": "sloppy", "body": {"name": 42, "age": "7"}, "test_type": "valid", "expected_status": 201},
        {"name": "broken", "body": {"age": "old"}, "test_type": "negative", "expected_status": 400}
    ]});
    let backend = Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, reply.to_string()));
    let orchestrator = orchestrator(AiConfig::default(), &[backend]);
    let endpoint = create_pet_endpoint();

    let generated = orchestrator.generate_cases(&endpoint, &options()).await;

    let schema = endpoint.request_body_schema.as_ref().expect("POST has a body");
    let valid = generated.cases[0].body.as_ref().expect("body kept");
    assert!(validates(valid, schema), "{valid}");
    assert_eq!(valid["age"], json!(7));
    assert_eq!(generated.cases[1].body, Some(json!({"age": "old"})));
}

/// Tenet: hybrid appends model cases to the untouched foundation
#[tokio::test]
async fn test_hybrid_appends_enhancements() {
    let extra = json!([
        {"name": "senior_pet", "body": {"name": "Max", "age": 30}, "test_type": "boundary", "expected_status": 201},
        {"name": "emoji_name", "body": {"name": "🐶"}, "test_type": "valid", "expected_status": 201}
    ]);
    let backend = Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, extra.to_string()));
    let config = AiConfig::default().with_hybrid_enhancement(true);
    let orchestrator = orchestrator(config, &[Arc::clone(&backend)]);
    let endpoint = create_pet_endpoint();

    let generated = orchestrator.generate_cases(&endpoint, &options()).await;

    let foundation = DeterministicProvider::default().assemble(&endpoint, &options());
    assert_eq!(generated.provider, ProviderKind::Hybrid);
    assert_eq!(generated.cases.len(), foundation.len() + 2);
    assert_eq!(&generated.cases[..foundation.len()], foundation.as_slice());
    assert_eq!(generated.cases[foundation.len()].name, "senior_pet");

    let request = &backend.requests()[0];
    assert!(!request.json_mode);
    assert!(request.prompt.contains("FOUNDATION TEST CASES"));
    assert!(request.prompt.contains("Pet Store Domain Guidance"));
}

/// Tenet: a failed enhancement adds nothing
#[tokio::test]
async fn test_hybrid_enhancement_failure_keeps_foundation() {
    let backend = Arc::new(ScriptedBackend::failing(BackendKind::OpenAi, 500));
    let orchestrator = orchestrator(AiConfig::default(), &[backend]);
    let endpoint = create_pet_endpoint();
    let options = options().with_provider("hybrid");

    let generated = orchestrator.generate_cases(&endpoint, &options).await;

    assert_eq!(generated.provider, ProviderKind::Hybrid);
    assert_eq!(
        generated.cases,
        DeterministicProvider::default().assemble(&endpoint, &options)
    );
}

/// Tenet: speed picks the backend by latency or fidelity
#[test]
fn test_speed_selection() {
    let openai = Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, "{}").with_profile(1, 2));
    let anthropic = Arc::new(ScriptedBackend::replying(BackendKind::Anthropic, "{}").with_profile(3, 9));
    let config = AiConfig::default().with_default_provider("anthropic");
    let orchestrator = orchestrator(config, &[openai, anthropic]);

    let primary = |options: GenerationOptions| orchestrator.provider_chain(&options).primary();
    assert_eq!(primary(GenerationOptions::default().with_speed(Speed::Fast)), ProviderKind::OpenAi);
    assert_eq!(primary(GenerationOptions::default().with_speed(Speed::Quality)), ProviderKind::Anthropic);
    assert_eq!(primary(GenerationOptions::default().with_speed(Speed::Balanced)), ProviderKind::Anthropic);
    assert_eq!(
        primary(GenerationOptions::default().with_provider("deterministic")),
        ProviderKind::Deterministic
    );

    let chain = orchestrator.provider_chain(&GenerationOptions::default().with_provider("anthropic"));
    assert_eq!(
        chain.kinds(),
        vec![ProviderKind::Anthropic, ProviderKind::OpenAi, ProviderKind::Deterministic]
    );
    let chain = orchestrator.provider_chain(&GenerationOptions::default().with_provider("gemini"));
    assert_eq!(chain.kinds(), vec![ProviderKind::Deterministic]);
}

/// Tenet: requests carry the tier's model and a JSON-mode prompt for the endpoint
#[tokio::test]
async fn test_request_shape() {
    let backend = Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, create_pet_reply()));
    let orchestrator = orchestrator(AiConfig::default(), &[Arc::clone(&backend)]);
    let options = options().with_speed(Speed::Quality).with_count(4);

    orchestrator
        .generate_cases(&create_pet_endpoint(), &options)
        .await;

    let request = &backend.requests()[0];
    assert_eq!(request.model, "scripted-quality");
    assert!(request.json_mode);
    assert_eq!(request.max_tokens, 3000);
    assert!(request.prompt.contains("Generate 4 comprehensive"));
    assert!(request.prompt.contains("createPet"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Tenet: whatever a backend says, generation yields cases
    #[test]
    fn prop_any_reply_yields_cases(reply in ".{0,200}") {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let backend = Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, reply));
        let orchestrator = orchestrator(AiConfig::default(), &[backend]);
        let generated = runtime.block_on(orchestrator.generate_cases(&create_pet_endpoint(), &options()));
        prop_assert!(!generated.cases.is_empty());
    }
}
