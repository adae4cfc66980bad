//! End-to-end generation through the pipeline and the queued service

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tdg_ai::{AiOrchestrator, BackendKind, CompletionBackend, GenerationOptions, ProviderKind};
use tdg_core::{
    GenerationError, GenerationPipeline, GenerationRequest, GenerationService, GeneratorConfig,
    JsonFilePackager,
};
use tdg_scheduler::{NoopSink, Priority, ProgressStage, TaskState};
use tdg_schema::HttpMethod;
use tdg_synth::TestType;
use tdg_test_utils::{create_pet_reply, petstore_document, RecordingSink, ScriptedBackend};

const WAIT: Duration = Duration::from_secs(5);

fn request() -> GenerationRequest {
    GenerationRequest::new(petstore_document()).with_options(GenerationOptions::default().with_seed(11))
}

fn deterministic_pipeline() -> GenerationPipeline {
    GenerationPipeline::new(Arc::new(AiOrchestrator::deterministic_only()))
}

/// Tenet: every endpoint gets its cases, ordered create-read-delete then valid-boundary-negative
#[tokio::test]
async fn test_petstore_report() {
    let report = deterministic_pipeline().run(&request(), &NoopSink).await.unwrap();

    assert_eq!(report.title.as_deref(), Some("Pet Store"));
    assert_eq!(report.endpoint_count, 4);
    assert_eq!(report.total_cases, 40);
    assert_eq!(report.cases.len(), 40);
    assert_eq!(report.provider, ProviderKind::Deterministic);
    let labels: Vec<_> = report.endpoints.iter().map(|e| e.endpoint.as_str()).collect();
    assert_eq!(
        labels,
        vec!["GET /pets", "POST /pets", "GET /pets/{petId}", "DELETE /pets/{petId}"]
    );

    assert_eq!(report.cases[0].method, HttpMethod::Post);
    assert_eq!(report.cases[0].test_type, TestType::Valid);
    assert_eq!(report.cases[39].method, HttpMethod::Delete);
    assert_eq!(report.cases[39].test_type, TestType::Negative);
    let ranks: Vec<_> = report
        .cases
        .iter()
        .map(|c| (c.method.crud_rank(), c.test_type.rank()))
        .collect();
    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    assert_eq!(ranks, sorted);
}

/// Tenet: each resource with a create and item operations yields one CRUD flow
#[tokio::test]
async fn test_report_carries_flows() {
    let report = deterministic_pipeline().run(&request(), &NoopSink).await.unwrap();

    assert_eq!(report.flows.len(), 1);
    let flow = &report.flows[0];
    assert_eq!(flow.name, "Pets CRUD Flow");
    let steps: Vec<_> = flow.steps.iter().map(|s| (s.method, s.path.as_str())).collect();
    assert_eq!(
        steps,
        vec![
            (HttpMethod::Post, "/pets"),
            (HttpMethod::Get, "/pets/${created_id}"),
            (HttpMethod::Delete, "/pets/${created_id}"),
        ]
    );
    assert_eq!(flow.steps[0].extract["created_id"], "$.id");
    assert!(flow.steps[0].body.as_ref().is_some_and(|b| b.get("name").is_some()));
}

/// Tenet: a seed makes the whole report reproducible
#[tokio::test]
async fn test_seeded_report_is_reproducible() {
    let pipeline = deterministic_pipeline();
    let first = pipeline.run(&request(), &NoopSink).await.unwrap();
    let second = pipeline.run(&request(), &NoopSink).await.unwrap();
    assert_eq!(first, second);
}

/// Tenet: identically shaped endpoints draw different values from one seed
#[tokio::test]
async fn test_endpoints_draw_distinct_values() {
    let body = json!({"content": {"application/json": {"schema": {
        "type": "object",
        "required": ["name", "age"],
        "properties": {
            "name": {"type": "string", "minLength": 3, "maxLength": 40},
            "age": {"type": "integer", "minimum": 0, "maximum": 100000}
        }
    }}}});
    let created = json!({"201": {"description": "created"}});
    let document = json!({"paths": {
        "/cats": {"post": {"requestBody": body.clone(), "responses": created.clone()}},
        "/dogs": {"post": {"requestBody": body, "responses": created}}
    }});
    let request = GenerationRequest::new(document).with_options(GenerationOptions::default().with_count(3).with_seed(3));

    let report = deterministic_pipeline().run(&request, &NoopSink).await.unwrap();
    let bodies = |path: &str| -> Vec<_> {
        report
            .cases
            .iter()
            .filter(|c| c.path == path && c.test_type == TestType::Valid)
            .map(|c| c.body.clone())
            .collect()
    };
    assert!(!bodies("/cats").is_empty());
    assert_ne!(bodies("/cats"), bodies("/dogs"));
    assert_eq!(report, deterministic_pipeline().run(&request, &NoopSink).await.unwrap());
}

/// Tenet: progress walks parsing, generating, complete with rising percentages
#[tokio::test]
async fn test_progress_sequence() {
    let config = GeneratorConfig::default();
    let service = GenerationService::with_orchestrator(config, AiOrchestrator::deterministic_only()).unwrap();
    let sink = RecordingSink::new();

    service.generate_now(&request(), &sink).await.unwrap();

    let events = sink.events();
    assert_eq!(
        sink.stages(),
        vec![
            ProgressStage::Parsing,
            ProgressStage::Parsing,
            ProgressStage::Generating,
            ProgressStage::Generating,
            ProgressStage::Generating,
            ProgressStage::Generating,
            ProgressStage::Generating,
            ProgressStage::Complete,
        ]
    );
    assert_eq!(events[1].endpoint_count, Some(4));
    assert_eq!(events[2].current_endpoint.as_deref(), Some("GET /pets"));
    let generating: Vec<u8> = events[2..7].iter().map(|e| e.progress).collect();
    assert_eq!(generating, vec![30, 45, 60, 75, 90]);
    assert_eq!(sink.last().unwrap().progress, 100);
    service.shutdown().await;
}

/// Tenet: an unresolvable document fails the request without cases
#[tokio::test]
async fn test_unresolved_reference_fails() {
    let document = json!({"paths": {"/pets": {"post": {
        "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Missing"}}}},
        "responses": {"201": {"description": "created"}}
    }}}});
    let err = deterministic_pipeline()
        .run(&GenerationRequest::new(document), &NoopSink)
        .await
        .unwrap_err();
    assert!(matches!(&err, GenerationError::Schema(e) if e.is_reference_error()), "{err}");
}

/// Tenet: queued requests complete with the same report as inline ones
#[tokio::test]
async fn test_service_submit_and_wait() {
    let config = GeneratorConfig::default().with_workers(1);
    let service = GenerationService::with_orchestrator(config, AiOrchestrator::deterministic_only()).unwrap();
    let sink = Arc::new(RecordingSink::new());

    let id = service.submit(request(), Priority::High, sink.clone()).unwrap();
    let report = service.wait(id, WAIT).await.unwrap();

    assert_eq!(report, service.generate_now(&request(), &NoopSink).await.unwrap());
    assert_eq!(service.status(id).await.unwrap().state, TaskState::Completed);
    assert!(sink.events().iter().all(|e| e.task_id == Some(id.to_string())));
    assert_eq!(service.stats().completed, 1);
    service.shutdown().await;
}

/// Tenet: a failed task surfaces its error through wait
#[tokio::test]
async fn test_service_failure_surfaces() {
    let service =
        GenerationService::with_orchestrator(GeneratorConfig::default(), AiOrchestrator::deterministic_only()).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let bad = GenerationRequest::new(json!({"paths": []}));

    let id = service.submit(bad, Priority::Normal, sink.clone()).unwrap();
    let err = service.wait(id, WAIT).await.unwrap_err();

    assert!(matches!(err, GenerationError::Task(_)), "{err}");
    assert_eq!(service.status(id).await.unwrap().state, TaskState::Failed);
    assert_eq!(sink.last().unwrap().stage, ProgressStage::Error);
    service.shutdown().await;
}

/// Tenet: invalid configuration is refused up front
#[tokio::test]
async fn test_invalid_config_rejected() {
    let err = GenerationService::new(GeneratorConfig::default().with_workers(0)).unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)));
}

/// Tenet: model-backed providers flow through to the per-endpoint summary
#[tokio::test]
async fn test_external_provider_in_report() {
    let backend: Arc<dyn CompletionBackend> =
        Arc::new(ScriptedBackend::replying(BackendKind::OpenAi, create_pet_reply()));
    let orchestrator = AiOrchestrator::with_backends(tdg_ai::AiConfig::default(), vec![backend]);
    let report = GenerationPipeline::new(Arc::new(orchestrator))
        .run(&request(), &NoopSink)
        .await
        .unwrap();

    assert_eq!(report.provider, ProviderKind::OpenAi);
    assert!(report.endpoints.iter().all(|e| e.provider == ProviderKind::OpenAi));
    assert!(report.cases.iter().any(|c| c.name == "create_dog"));
}

/// Tenet: an installed packager runs between generating and complete
#[tokio::test]
async fn test_packager_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let service = GenerationService::with_packager(
        GeneratorConfig::default(),
        AiOrchestrator::deterministic_only(),
        Arc::new(JsonFilePackager::new(dir.path())),
    )
    .unwrap();
    let sink = RecordingSink::new();

    let report = service.generate_now(&request(), &sink).await.unwrap();

    let artifact = report.artifact.clone().unwrap();
    assert!(artifact.ends_with("pet-store-test-cases.json"), "{artifact}");
    let written: serde_json::Value = serde_json::from_slice(&std::fs::read(&artifact).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), report.total_cases);
    let stages = sink.stages();
    let tail = &stages[stages.len() - 3..];
    assert_eq!(tail, &[ProgressStage::Zipping, ProgressStage::Zipping, ProgressStage::Complete]);
    service.shutdown().await;
}
