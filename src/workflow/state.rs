//! Per-request resolution state and the public answer envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ProviderError};
use crate::knowledge::KbMatch;

use super::confidence::ConfidenceBand;

/// Difficulty label used when the caller supplies none.
pub const DEFAULT_DIFFICULTY: &str = "JEE_Main";

/// User-facing answer when every tier came up empty.
pub const NOT_FOUND_MESSAGE: &str = "NOT FOUND - This question could not be answered. \
The problem is not in our knowledge base and was not found on the web.";

/// Source tag of the terminal not-found state.
pub const NOT_FOUND_TAG: &str = "not_found";

/// Source tag when analysis of a knowledge-base hit failed.
pub const ANALYSIS_FAILED_TAG: &str = "analysis_failed";

fn default_difficulty() -> String {
    DEFAULT_DIFFICULTY.to_string()
}

/// A question to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub question: String,
    /// Opaque difficulty label.
    #[serde(default = "default_difficulty")]
    pub difficulty_hint: String,
}

impl ResolutionRequest {
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            difficulty_hint: default_difficulty(),
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty_hint = difficulty.into();
        self
    }

    /// Reject requests the engine cannot run.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyQuestion` for a blank question.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.question.trim().is_empty() {
            return Err(ConfigurationError::EmptyQuestion);
        }
        Ok(())
    }
}

/// Which tier produced the terminal answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    #[default]
    None,
    AnalysisWithKb,
    /// A knowledge-base hit whose analysis failed; the answer is an error.
    AnalysisFailed,
    WebSearch,
    NotFound,
}

impl Source {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Tier at which a provider failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    KnowledgeBase,
    Analysis,
    WebSearch,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::KnowledgeBase => "knowledge base",
            Self::Analysis => "analysis",
            Self::WebSearch => "web search",
        };
        f.write_str(label)
    }
}

/// Transport failures were raised by the provider; content failures were
/// returned as a normal response that signals "no answer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Content,
}

/// The most recent provider failure recorded during a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub tier: Tier,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    #[must_use]
    pub fn transport(tier: Tier, error: &ProviderError) -> Self {
        Self {
            tier,
            kind: ErrorKind::Transport,
            message: error.to_string(),
        }
    }

    #[must_use]
    pub fn content(tier: Tier, message: impl Into<String>) -> Self {
        Self {
            tier,
            kind: ErrorKind::Content,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.tier, self.message)
    }
}

/// Working record threaded through the workflow for a single request.
///
/// Only the engine's node functions mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionState {
    pub(super) question: String,
    pub(super) difficulty: String,
    pub(super) kb_matches: Vec<KbMatch>,
    pub(super) best_match: Option<KbMatch>,
    pub(super) confidence: ConfidenceBand,
    pub(super) confidence_score: f64,
    pub(super) analysis_answer: Option<String>,
    pub(super) web_answer: Option<String>,
    pub(super) final_answer: Option<String>,
    pub(super) source: Source,
    pub(super) source_tag: Option<String>,
    pub(super) note: String,
    pub(super) last_error: Option<ErrorInfo>,
}

impl ResolutionState {
    #[must_use]
    pub fn new(request: &ResolutionRequest) -> Self {
        Self {
            question: request.question.trim().to_string(),
            difficulty: request.difficulty_hint.clone(),
            kb_matches: Vec::new(),
            best_match: None,
            confidence: ConfidenceBand::None,
            confidence_score: 0.0,
            analysis_answer: None,
            web_answer: None,
            final_answer: None,
            source: Source::None,
            source_tag: None,
            note: String::new(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    #[must_use]
    pub fn kb_matches(&self) -> &[KbMatch] {
        &self.kb_matches
    }

    #[must_use]
    pub fn best_match(&self) -> Option<&KbMatch> {
        self.best_match.as_ref()
    }

    #[must_use]
    pub fn confidence(&self) -> ConfidenceBand {
        self.confidence
    }

    #[must_use]
    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    #[must_use]
    pub fn analysis_answer(&self) -> Option<&str> {
        self.analysis_answer.as_deref()
    }

    #[must_use]
    pub fn web_answer(&self) -> Option<&str> {
        self.web_answer.as_deref()
    }

    #[must_use]
    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    #[must_use]
    pub fn source_tag(&self) -> Option<&str> {
        self.source_tag.as_deref()
    }

    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    /// Whether a non-empty final answer is present.
    #[must_use]
    pub fn has_answer(&self) -> bool {
        self.final_answer
            .as_deref()
            .is_some_and(|answer| !answer.trim().is_empty())
    }

    /// Project the terminal state into the caller-facing envelope.
    #[must_use]
    pub fn into_envelope(self) -> ResolutionEnvelope {
        ResolutionEnvelope {
            final_answer: self.final_answer.unwrap_or_default(),
            source: self.source_tag.unwrap_or_default(),
            tier: self.source,
            confidence: self.confidence,
            confidence_score: self.confidence_score,
            note: self.note,
            kb_matches: self.kb_matches,
            error: self.last_error.map(|e| e.to_string()),
        }
    }
}

/// Uniform answer record, whichever tier produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionEnvelope {
    pub final_answer: String,
    /// Provider-specific tag such as `gemini_with_db` or `perplexity_web`.
    /// Opaque to callers; depends on the configured topology.
    pub source: String,
    /// Topology-independent tier that terminated the resolution.
    pub tier: Source,
    pub confidence: ConfidenceBand,
    pub confidence_score: f64,
    pub note: String,
    pub kb_matches: Vec<KbMatch>,
    pub error: Option<String>,
}
