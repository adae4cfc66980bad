//! TDG Synth - schema-driven value synthesis and case assembly
//!
//! Deterministic half of test case generation:
//! - [`SchemaSynthesizer`] produces valid, boundary and negative values for
//!   a [`SchemaNode`](tdg_schema::SchemaNode)
//! - [`CaseAssembler`] turns an endpoint into a typed set of [`TestCase`]s
//! - [`order_cases`] gives a flattened set its canonical order
//! - [`FlowComposer`] chains a resource's endpoints into CRUD [`TestFlow`]s
//! - [`conformance`] checks and coerces values produced elsewhere
//!
//! # Example
//!
//! ```
//! use tdg_schema::{Endpoint, HttpMethod};
//! use tdg_synth::CaseAssembler;
//!
//! let endpoint = Endpoint::new(HttpMethod::Get, "/health");
//! let cases = CaseAssembler::default().assemble(&endpoint, 10, None, Some(42));
//! assert_eq!(cases.len(), 10);
//! ```

pub mod assembler;
pub mod case;
pub mod conformance;
pub mod flows;
pub mod formats;
pub mod pattern;
pub mod synthesizer;
pub mod vocab;

pub use assembler::{order_cases, CaseAssembler, CaseCounts, NegativeScenario};
pub use case::{TestCase, TestType};
pub use conformance::{conform, validates};
pub use flows::{FlowAssertion, FlowComposer, FlowStep, TestFlow};
pub use pattern::PatternGenerator;
pub use synthesizer::{type_mismatch, SchemaSynthesizer, SynthesisLimits, SynthesisMode};
pub use vocab::Domain;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// RNG seeded from `seed`, or from OS entropy when absent
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
