//! Queued generation service
//!
//! [`GenerationService`] puts a [`GenerationScheduler`] in front of the
//! pipeline: requests are admitted by priority, run on the worker pool and
//! their reports stay queryable for the retention window.

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::pipeline::{GenerationPipeline, GenerationReport, GenerationRequest, Packager, PipelineRunner};
use std::sync::Arc;
use std::time::Duration;
use tdg_ai::AiOrchestrator;
use tdg_scheduler::{
    GenerationScheduler, Priority, ProgressSink, SchedulerStats, TaskId, TaskOutcome, TaskRecord,
};

/// Scheduler-backed generation front end
#[derive(Debug)]
pub struct GenerationService {
    config: GeneratorConfig,
    scheduler: GenerationScheduler<PipelineRunner>,
}

impl GenerationService {
    /// Service with backends taken from `config.ai`
    ///
    /// # Errors
    ///
    /// [`GenerationError::Config`] when `config` fails validation.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let orchestrator = AiOrchestrator::new(config.ai.clone());
        Self::with_orchestrator(config, orchestrator)
    }

    /// Service over a caller-built orchestrator
    ///
    /// # Errors
    ///
    /// [`GenerationError::Config`] when `config` fails validation.
    pub fn with_orchestrator(config: GeneratorConfig, orchestrator: AiOrchestrator) -> Result<Self, GenerationError> {
        Self::build(config, orchestrator, None)
    }

    /// Service whose reports are passed through `packager`
    ///
    /// # Errors
    ///
    /// [`GenerationError::Config`] when `config` fails validation.
    pub fn with_packager(
        config: GeneratorConfig,
        orchestrator: AiOrchestrator,
        packager: Arc<dyn Packager>,
    ) -> Result<Self, GenerationError> {
        Self::build(config, orchestrator, Some(packager))
    }

    fn build(
        config: GeneratorConfig,
        orchestrator: AiOrchestrator,
        packager: Option<Arc<dyn Packager>>,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let pipeline = GenerationPipeline::new(Arc::new(orchestrator)).with_max_cases(config.max_cases_per_endpoint);
        let mut runner = PipelineRunner::new(pipeline);
        if let Some(packager) = packager {
            runner = runner.with_packager(packager);
        }
        let scheduler = GenerationScheduler::new(runner, config.scheduler_config());
        Ok(Self { config, scheduler })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Queue a request
    ///
    /// # Errors
    ///
    /// Queue full or service shut down.
    pub fn submit(
        &self,
        request: GenerationRequest,
        priority: Priority,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<TaskId, GenerationError> {
        Ok(self.scheduler.submit(request, priority, progress)?)
    }

    /// Current status, `None` for unknown or purged tasks
    pub async fn status(&self, id: TaskId) -> Option<TaskRecord> {
        self.scheduler.status(id).await
    }

    /// Terminal outcome, `None` while live or after purge
    pub async fn outcome(&self, id: TaskId) -> Option<TaskOutcome<GenerationReport>> {
        self.scheduler.outcome(id).await
    }

    /// Wait up to `timeout` for the report
    ///
    /// # Errors
    ///
    /// Unknown task, timeout, or the task's own failure.
    pub async fn wait(&self, id: TaskId, timeout: Duration) -> Result<GenerationReport, GenerationError> {
        let outcome = self.scheduler.wait(id, timeout).await?;
        Ok(outcome.output?)
    }

    /// Run a request inline, bypassing the queue
    ///
    /// # Errors
    ///
    /// Schema resolution or packaging failures.
    pub async fn generate_now(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GenerationReport, GenerationError> {
        self.scheduler.runner().execute(request, progress).await
    }

    /// Scheduler counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Stop accepting work and drain running tasks
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
