//! TDG Core - generation pipeline and service
//!
//! Ties the workspace together:
//! - [`GeneratorConfig`] loads TOML and environment settings
//! - [`GenerationPipeline`] turns an OpenAPI document into ordered cases
//! - [`GenerationService`] runs requests through the priority scheduler
//! - [`init_tracing`] installs the log subscriber
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use std::sync::Arc;
//! use tdg_ai::AiOrchestrator;
//! use tdg_core::{GenerationPipeline, GenerationRequest};
//! use tdg_scheduler::NoopSink;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let pipeline = GenerationPipeline::new(Arc::new(AiOrchestrator::deterministic_only()));
//! let document = json!({"paths": {"/health": {"get": {"responses": {"200": {"description": "ok"}}}}}});
//! let report = runtime
//!     .block_on(pipeline.run(&GenerationRequest::new(document), &NoopSink))
//!     .unwrap();
//! assert_eq!(report.endpoint_count, 1);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod telemetry;

pub use config::GeneratorConfig;
pub use error::{ConfigError, GenerationError};
pub use pipeline::{
    EndpointSummary, GenerationPipeline, GenerationReport, GenerationRequest, JsonFilePackager, Packager,
    PipelineRunner,
};
pub use service::GenerationService;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
