//! Document-to-report generation pipeline
//!
//! [`GenerationPipeline`] resolves a document, selects providers once for
//! the session and generates every endpoint in document order, reporting
//! progress as it goes. Each endpoint draws from its own seed derived from
//! the session seed, and CRUD [`TestFlow`]s are composed alongside the
//! cases.
//!
//! | Stage | Progress |
//! |---|---|
//! | `parsing` | 10, then 100 once endpoints are known |
//! | `generating` | 30 to 90 across endpoints |
//! | `zipping` | 20 and 100 around an installed [`Packager`] |
//! | `complete` | 100 |

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tdg_ai::{AiOrchestrator, GenerationOptions, ProviderKind};
use tdg_scheduler::{ProgressEvent, ProgressSink, ProgressStage, TaskExecutionError, TaskId, TaskRunner};
use tdg_schema::normalize_document;
use tdg_synth::{order_cases, FlowComposer, TestCase, TestFlow};

/// One generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// OpenAPI 3.x document
    pub document: Value,
    /// Generation settings
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Request with default options
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self {
            document,
            options: GenerationOptions::default(),
        }
    }

    /// Replace the options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Cases produced for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    /// `METHOD /path`
    pub endpoint: String,
    /// Provider that answered
    pub provider: ProviderKind,
    /// Cases produced
    pub cases: usize,
}

/// Result of a generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// `info.title` of the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Endpoints in the document
    pub endpoint_count: usize,
    /// Cases across all endpoints
    pub total_cases: usize,
    /// Cases in canonical order
    pub cases: Vec<TestCase>,
    /// Provider selected for the session
    pub provider: ProviderKind,
    /// Per-endpoint breakdown, in document order
    pub endpoints: Vec<EndpointSummary>,
    /// Multi-step CRUD flows, one per resource
    #[serde(default)]
    pub flows: Vec<TestFlow>,
    /// Packaged artifact, when a packager ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

/// Resolve, generate and order
#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    orchestrator: Arc<AiOrchestrator>,
    flows: FlowComposer,
    max_cases: usize,
}

impl GenerationPipeline {
    /// Pipeline over `orchestrator`
    #[must_use]
    pub fn new(orchestrator: Arc<AiOrchestrator>) -> Self {
        Self {
            flows: FlowComposer::new(Arc::clone(orchestrator.synthesizer())),
            orchestrator,
            max_cases: tdg_ai::MAX_CASES,
        }
    }

    /// Cap cases per endpoint
    #[inline]
    #[must_use]
    pub fn with_max_cases(mut self, max_cases: usize) -> Self {
        self.max_cases = max_cases.max(tdg_ai::MIN_CASES);
        self
    }

    /// Generate cases for every endpoint of `request.document`
    ///
    /// # Errors
    ///
    /// [`GenerationError::Schema`] when the document cannot be resolved.
    /// Provider failures never surface here.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GenerationReport, GenerationError> {
        progress.emit(ProgressEvent::new(ProgressStage::Parsing, 10, "Parsing API specification"));
        let api = normalize_document(&request.document)?;
        let endpoint_count = api.endpoints.len();
        progress.emit(
            ProgressEvent::new(
                ProgressStage::Parsing,
                100,
                format!("Found {endpoint_count} endpoints"),
            )
            .with_endpoint_count(endpoint_count),
        );

        let capped = request.options.count.min(self.max_cases);
        let options = request.options.clone().with_count(capped);
        let chain = self.orchestrator.provider_chain(&options);

        let mut cases = Vec::new();
        let mut endpoints = Vec::with_capacity(endpoint_count);
        for (index, endpoint) in api.endpoints.iter().enumerate() {
            let label = endpoint.label();
            progress.emit(
                ProgressEvent::new(
                    ProgressStage::Generating,
                    generating_progress(index, endpoint_count),
                    format!("Generating tests for {label}"),
                )
                .with_endpoint_count(endpoint_count)
                .with_current_endpoint(label.clone()),
            );
            let generated = chain.generate(endpoint, &options.for_endpoint(index)).await;
            endpoints.push(EndpointSummary {
                endpoint: label,
                provider: generated.provider,
                cases: generated.cases.len(),
            });
            cases.extend(generated.cases);
        }

        order_cases(&mut cases);
        let flows = self.flows.compose(&api.endpoints, options.domain(), options.seed);
        progress.emit(
            ProgressEvent::new(
                ProgressStage::Generating,
                90,
                format!("Generated {} test cases", cases.len()),
            )
            .with_endpoint_count(endpoint_count),
        );
        tracing::info!(
            endpoints = endpoint_count,
            cases = cases.len(),
            flows = flows.len(),
            provider = chain.primary().as_str(),
            task_id = options.task_id.as_deref().unwrap_or("-"),
            "generation finished"
        );

        Ok(GenerationReport {
            title: api.title,
            endpoint_count,
            total_cases: cases.len(),
            cases,
            provider: chain.primary(),
            endpoints,
            flows,
            artifact: None,
        })
    }
}

/// 30 for the first endpoint, approaching 90 for the last
fn generating_progress(index: usize, total: usize) -> u8 {
    let step = 60 * index / total.max(1);
    u8::try_from(30 + step).unwrap_or(90)
}

/// Post-generation packaging, such as archiving the cases
#[async_trait]
pub trait Packager: Send + Sync {
    /// Package `report`, returning a reference to the artifact
    async fn package(&self, report: &GenerationReport) -> Result<String, GenerationError>;
}

/// Writes the cases of each report as pretty JSON into a directory
#[derive(Debug, Clone)]
pub struct JsonFilePackager {
    directory: PathBuf,
}

impl JsonFilePackager {
    /// Packager writing into `directory`, created on demand
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl Packager for JsonFilePackager {
    async fn package(&self, report: &GenerationReport) -> Result<String, GenerationError> {
        let stem = report
            .title
            .as_deref()
            .map(slug)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "api".to_string());
        let path = self.directory.join(format!("{stem}-test-cases.json"));
        let body = serde_json::to_vec_pretty(&report.cases)
            .map_err(|e| GenerationError::Packaging(e.to_string()))?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| GenerationError::Packaging(format!("{}: {e}", self.directory.display())))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| GenerationError::Packaging(format!("{}: {e}", path.display())))?;
        Ok(path.display().to_string())
    }
}

fn slug(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Pipeline plus optional packaging; the scheduler's task runner
#[derive(Clone)]
pub struct PipelineRunner {
    pipeline: GenerationPipeline,
    packager: Option<Arc<dyn Packager>>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("pipeline", &self.pipeline)
            .field("packager", &self.packager.is_some())
            .finish()
    }
}

impl PipelineRunner {
    /// Runner without packaging
    #[must_use]
    pub fn new(pipeline: GenerationPipeline) -> Self {
        Self {
            pipeline,
            packager: None,
        }
    }

    /// Install a packager
    #[inline]
    #[must_use]
    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = Some(packager);
        self
    }

    /// Run the pipeline and packaging, ending with a `complete` event
    ///
    /// # Errors
    ///
    /// Schema resolution or packaging failures.
    pub async fn execute(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GenerationReport, GenerationError> {
        let mut report = self.pipeline.run(request, progress).await?;
        if let Some(packager) = &self.packager {
            progress.emit(ProgressEvent::new(ProgressStage::Zipping, 20, "Packaging test cases"));
            let artifact = packager.package(&report).await?;
            progress.emit(ProgressEvent::new(ProgressStage::Zipping, 100, format!("Packaged {artifact}")));
            report.artifact = Some(artifact);
        }
        progress.emit(
            ProgressEvent::new(
                ProgressStage::Complete,
                100,
                format!("Generation complete: {} test cases", report.total_cases),
            )
            .with_endpoint_count(report.endpoint_count),
        );
        Ok(report)
    }
}

#[async_trait]
impl TaskRunner for PipelineRunner {
    type Payload = GenerationRequest;
    type Output = GenerationReport;

    async fn run(
        &self,
        task_id: TaskId,
        mut payload: GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GenerationReport, TaskExecutionError> {
        payload.options.task_id = Some(task_id.to_string());
        self.execute(&payload, progress)
            .await
            .map_err(TaskExecutionError::failed)
    }
}
