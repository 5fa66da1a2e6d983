//! Knowledge-base records.

use serde::{Deserialize, Serialize};

/// A curated, solved problem stored in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Stable identifier (e.g. `alg_001`).
    pub problem_id: String,
    pub question: String,
    /// Ordered worked-solution steps.
    #[serde(default)]
    pub solution_steps: Vec<String>,
    pub final_answer: String,
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub topic: String,
}

/// One ranked candidate returned by a knowledge-base search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbMatch {
    #[serde(flatten)]
    pub problem: Problem,
    /// Similarity in `[0, 1]`.
    pub score: f64,
}

impl KbMatch {
    #[must_use]
    pub fn new(problem: Problem, score: f64) -> Self {
        Self { problem, score }
    }

    #[must_use]
    pub fn problem_id(&self) -> &str {
        &self.problem.problem_id
    }
}

/// Per-topic overview of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic: String,
    pub count: usize,
    /// Up to two example problem ids, in insertion order.
    pub examples: Vec<String>,
}
