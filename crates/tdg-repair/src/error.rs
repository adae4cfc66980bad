//! Error types for JSON repair

use crate::engine::RepairStep;

/// Raised when no repair step yields parseable JSON
#[derive(Debug, thiserror::Error)]
pub enum JsonRepairError {
    /// Nothing but whitespace was supplied
    #[error("nothing to repair: input is empty")]
    EmptyInput,

    /// Every step ran and the text still does not parse
    #[error("input could not be repaired after {} step(s)", applied.len())]
    Unrepairable {
        /// Steps that changed the text before giving up
        applied: Vec<RepairStep>,
    },
}

impl JsonRepairError {
    /// Steps attempted before failing
    #[must_use]
    pub fn applied(&self) -> &[RepairStep] {
        match self {
            Self::EmptyInput => &[],
            Self::Unrepairable { applied } => applied,
        }
    }
}
