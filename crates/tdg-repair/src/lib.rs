//! TDG Repair - recovery of malformed JSON
//!
//! Language models return JSON that is fenced in markdown, truncated,
//! single-quoted or surrounded by prose. [`JsonRepairEngine`] runs an
//! ordered pipeline of text repairs, re-parsing after each one:
//!
//! 1. Parse as-is
//! 2. Normalize quotes and literals
//! 3. Insert missing commas
//! 4. Close unterminated strings
//! 5. Complete truncated structures
//! 6. Extract the first balanced container
//! 7. Rebuild a `{"cases": [...]}` wrapper, or fall back to empty cases
//!
//! Each outcome carries the ordered list of steps that were applied.

#![warn(unreachable_pub)]

pub mod engine;
pub mod error;
pub mod scanner;
pub mod steps;

pub use engine::{repair_json, JsonRepairEngine, RepairOptions, RepairOutcome, RepairStep};
pub use error::JsonRepairError;
