//! Content filters for incoming questions and outgoing answers.
//!
//! The input guard keeps the resolver on mathematics; the output guard
//! blocks harmful answers and masks contact details before they are shown.

mod gateway;
mod input;
mod output;
mod vocabulary;

use serde::{Deserialize, Serialize};

pub use gateway::{Gateway, ScreenedResponse, BLOCKED_RESPONSE};
pub use input::{InputGuard, InputReport};
pub use output::OutputGuard;
pub use vocabulary::TermSet;

/// Result of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardOutcome {
    Approved,
    /// Allowed through, but flagged.
    Warning,
    Rejected,
}

/// Guard outcome with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardVerdict {
    pub outcome: GuardOutcome,
    pub message: String,
}

impl GuardVerdict {
    pub(crate) fn new(outcome: GuardOutcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.outcome == GuardOutcome::Approved
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.outcome == GuardOutcome::Rejected
    }
}

/// Error type for guardrail construction.
#[derive(thiserror::Error, Debug)]
pub enum GuardrailError {
    /// Invalid regex pattern.
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
