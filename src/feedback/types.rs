//! Feedback records and summaries.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::workflow::{ConfidenceBand, ResolutionEnvelope};

use super::FeedbackError;

/// User rating of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    ThumbsUp,
    ThumbsDown,
}

impl Rating {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThumbsUp => "thumbs_up",
            Self::ThumbsDown => "thumbs_down",
        }
    }
}

impl FromStr for Rating {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "thumbs_up" => Ok(Self::ThumbsUp),
            "thumbs_down" => Ok(Self::ThumbsDown),
            other => Err(FeedbackError::InvalidRating(other.to_string())),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of feedback, derived from which optional fields were supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Rating,
    Correction,
    Comment,
}

impl FeedbackType {
    /// A correction wins over a comment; neither means a plain rating.
    #[must_use]
    pub fn derive(correction: Option<&str>, comment: Option<&str>) -> Self {
        let present = |field: Option<&str>| field.is_some_and(|s| !s.trim().is_empty());
        if present(correction) {
            Self::Correction
        } else if present(comment) {
            Self::Comment
        } else {
            Self::Rating
        }
    }
}

/// Resolution details captured alongside a rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackMetadata {
    /// Source tag of the rated answer, e.g. `gemini_with_db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

impl FeedbackMetadata {
    #[must_use]
    pub fn from_envelope(envelope: &ResolutionEnvelope) -> Self {
        Self {
            source: (!envelope.source.is_empty()).then(|| envelope.source.clone()),
            confidence: Some(envelope.confidence),
            confidence_score: Some(envelope.confidence_score),
        }
    }
}

/// Feedback as submitted, before the store assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSubmission {
    pub question: String,
    pub answer: String,
    pub rating: Rating,
    pub correction: Option<String>,
    pub comment: Option<String>,
    pub metadata: FeedbackMetadata,
}

impl FeedbackSubmission {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>, rating: Rating) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            rating,
            correction: None,
            comment: None,
            metadata: FeedbackMetadata::default(),
        }
    }

    /// Rate the answer carried by a resolution envelope.
    #[must_use]
    pub fn from_envelope(
        question: impl Into<String>,
        envelope: &ResolutionEnvelope,
        rating: Rating,
    ) -> Self {
        Self {
            metadata: FeedbackMetadata::from_envelope(envelope),
            ..Self::new(question, envelope.final_answer.clone(), rating)
        }
    }

    #[must_use]
    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A persisted feedback record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Sequential, starting at 1.
    pub id: u64,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub question: String,
    pub answer: String,
    pub rating: Rating,
    pub feedback_type: FeedbackType,
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub metadata: FeedbackMetadata,
}

impl FeedbackEntry {
    #[must_use]
    pub fn has_correction(&self) -> bool {
        self.correction
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

/// Totals and rates over the whole log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStatistics {
    pub total_feedback: usize,
    pub positive: usize,
    pub negative: usize,
    pub positive_rate: f64,
    pub negative_rate: f64,
    pub with_corrections: usize,
    pub correction_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ExpandKnowledgeBase,
    ImproveSearch,
    TopicCoverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

/// Suggested follow-up derived from negative feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub reason: String,
    pub action: String,
}

/// Breakdown of negative feedback by source tag and topic keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeSummary {
    pub total_negative: usize,
    pub sources: BTreeMap<String, usize>,
    pub topics: BTreeMap<String, usize>,
    pub recommendations: Vec<Recommendation>,
}
