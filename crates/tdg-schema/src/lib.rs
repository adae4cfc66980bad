//! TDG Schema - endpoint model and reference resolution
//!
//! Turns a raw OpenAPI 3.x document into immutable [`Endpoint`] records:
//! - Typed schema nodes covering the constraint subset used for synthesis
//! - Document-local `$ref` resolution with a cycle guard
//! - Path/operation parameter merging
//! - Authentication scheme detection
//!
//! # Example
//!
//! ```rust,ignore
//! use tdg_schema::normalize_document;
//!
//! let api = normalize_document(&document)?;
//! for endpoint in &api.endpoints {
//!     println!("{}", endpoint.label());
//! }
//! ```

#![warn(unreachable_pub)]

pub mod endpoint;
pub mod error;
pub mod pointer;
pub mod resolver;
pub mod schema;

pub use endpoint::{
    AuthType, Endpoint, HttpMethod, NormalizedApi, Parameter, ParameterLocation, ResponseSpec,
};
pub use error::SchemaResolutionError;
pub use pointer::JsonPointer;
pub use resolver::{normalize_document, SchemaResolver};
pub use schema::{AdditionalProperties, Bound, Exclusive, SchemaNode, SchemaType, TypeDecl};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
