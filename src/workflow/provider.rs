//! Collaborator contracts consumed by the workflow engine.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::knowledge::KbMatch;

/// Parameters for a knowledge-base search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub top_k: usize,
    pub score_threshold: f64,
    /// Exact topic to restrict results to.
    pub topic_filter: Option<String>,
}

impl SearchParams {
    pub const MIN_TOP_K: usize = 1;
    pub const MAX_TOP_K: usize = 10;

    #[must_use]
    pub fn new(top_k: usize, score_threshold: f64) -> Self {
        Self {
            top_k,
            score_threshold,
            topic_filter: None,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic_filter = Some(topic.into());
        self
    }

    /// Clamp `top_k` into `[1, 10]` and the threshold into `[0, 1]`.
    ///
    /// A NaN threshold becomes `0.0`.
    #[must_use]
    pub fn clamped(self) -> Self {
        let score_threshold = if self.score_threshold.is_nan() {
            0.0
        } else {
            self.score_threshold.clamp(0.0, 1.0)
        };
        Self {
            top_k: self.top_k.clamp(Self::MIN_TOP_K, Self::MAX_TOP_K),
            score_threshold,
            topic_filter: self.topic_filter,
        }
    }
}

/// Ranked semantic lookup over curated problems.
///
/// Implementations must return matches ordered by descending score, at most
/// `top_k` of them, with every score in `[0, 1]`.
#[async_trait]
pub trait KnowledgeBaseProvider: Send + Sync {
    async fn search(&self, query: &str, params: &SearchParams)
        -> Result<Vec<KbMatch>, ProviderError>;
}

/// Answers a question grounded in serialized knowledge-base context.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, question: &str, context: &str) -> Result<String, ProviderError>;
}

/// Answers a bare question from open web search.
///
/// A successful return may still carry a failure phrase ("search failed",
/// "API key missing"); the engine screens for those.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, question: &str) -> Result<String, ProviderError>;
}
