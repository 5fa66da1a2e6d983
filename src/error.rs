//! Error types shared by the provider layer and the workflow engine.

use std::time::Duration;

use thiserror::Error;

/// Failure talking to a collaborator (knowledge base, analysis or web search).
///
/// The engine never lets these escape `resolve()`; they are recorded in the
/// resolution state and drive routing instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("API key not configured (env: {0})")]
    MissingApiKey(String),
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Provider call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Whether the failure was a timeout (externally imposed or from the HTTP client).
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Contract violations that reject a call before any tier runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Question must not be empty")]
    EmptyQuestion,
    #[error("At least one escalation stage is required")]
    NoEscalationStages,
    #[error("Invalid {name}: {value} (expected a value in [0, 1])")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Provider timeout must be greater than zero")]
    ZeroTimeout,
    #[error("Failed to build provider for stage '{stage}': {source}")]
    Provider {
        stage: String,
        #[source]
        source: ProviderError,
    },
}
