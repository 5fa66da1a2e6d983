//! In-process knowledge base ranked by lexical cosine similarity.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ProviderError;
use crate::workflow::{KnowledgeBaseProvider, SearchParams};

use super::types::{KbMatch, Problem, TopicSummary};

/// Problems bundled with the crate.
const SAMPLE_PROBLEMS: &str = include_str!("../../data/sample_problems.json");

/// Words that carry no signal for matching.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "by", "for", "if", "in", "is", "of", "on", "that", "the", "this", "to",
    "what", "with",
];

/// Punctuation dropped during tokenization. Other symbols become tokens.
const IGNORED_PUNCTUATION: &[char] = &[
    ',', '.', ';', ':', '?', '!', '(', ')', '[', ']', '{', '}', '"', '\'', '`',
];

/// Maximum number of example ids per topic summary.
const TOPIC_EXAMPLES: usize = 2;

/// Errors loading seed problems.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse seed problems: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Split text into lower-cased alphanumeric runs and standalone symbols.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if !c.is_whitespace() && !IGNORED_PUNCTUATION.contains(&c) {
            tokens.push(c.to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens.retain(|t| !STOPWORDS.contains(&t.as_str()));
    tokens
}

/// Sparse term-frequency vector.
#[derive(Debug, Clone, Default)]
struct TermVector {
    weights: HashMap<String, f64>,
    norm: f64,
}

impl TermVector {
    fn from_text(text: &str) -> Self {
        let mut weights: HashMap<String, f64> = HashMap::new();
        for token in tokenize(text) {
            *weights.entry(token).or_insert(0.0) += 1.0;
        }
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn cosine(&self, other: &Self) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|v| w * v))
            .sum();
        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
struct IndexedProblem {
    problem: Problem,
    vector: TermVector,
}

/// Knowledge base held in memory.
///
/// Searches take a read lock; `add_problem` serializes writes.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBase {
    entries: RwLock<Vec<IndexedProblem>>,
}

impl InMemoryKnowledgeBase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_problems(problems: impl IntoIterator<Item = Problem>) -> Self {
        let kb = Self::new();
        for problem in problems {
            kb.add_problem(problem);
        }
        kb
    }

    /// Parse a JSON array of problems.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::ParseError` if the JSON is not a problem list.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        let problems: Vec<Problem> = serde_json::from_str(json)?;
        Ok(Self::from_problems(problems))
    }

    /// Knowledge base with the bundled sample problems.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::ParseError` if the bundled data is malformed.
    pub fn with_sample_problems() -> Result<Self, SeedError> {
        Self::from_json(SAMPLE_PROBLEMS)
    }

    /// Load problems from a JSON seed file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError` if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SeedError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })?;
        let kb = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), count = kb.count(), "Loaded seed problems");
        Ok(kb)
    }

    /// Insert a problem, replacing any existing entry with the same id.
    pub fn add_problem(&self, problem: Problem) {
        let vector = TermVector::from_text(&problem.question);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.problem.problem_id == problem.problem_id)
        {
            tracing::debug!(problem = %problem.problem_id, "Replaced problem");
            *existing = IndexedProblem { problem, vector };
        } else {
            tracing::debug!(problem = %problem.problem_id, "Added problem");
            entries.push(IndexedProblem { problem, vector });
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Look up a problem by exact id.
    #[must_use]
    pub fn get(&self, problem_id: &str) -> Option<Problem> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.problem.problem_id == problem_id)
            .map(|e| e.problem.clone())
    }

    /// All problem ids in insertion order.
    #[must_use]
    pub fn problem_ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.problem.problem_id.clone())
            .collect()
    }

    /// Topics sorted by name, with counts and example ids.
    #[must_use]
    pub fn topics(&self) -> Vec<TopicSummary> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut by_topic: BTreeMap<&str, TopicSummary> = BTreeMap::new();

        for entry in entries.iter() {
            let summary = by_topic
                .entry(entry.problem.topic.as_str())
                .or_insert_with(|| TopicSummary {
                    topic: entry.problem.topic.clone(),
                    count: 0,
                    examples: Vec::new(),
                });
            summary.count += 1;
            if summary.examples.len() < TOPIC_EXAMPLES {
                summary.examples.push(entry.problem.problem_id.clone());
            }
        }

        by_topic.into_values().collect()
    }

    /// Rank problems against a query.
    #[must_use]
    pub fn rank(&self, query: &str, params: &SearchParams) -> Vec<KbMatch> {
        let query_vector = TermVector::from_text(query);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<KbMatch> = entries
            .iter()
            .filter(|e| {
                params
                    .topic_filter
                    .as_deref()
                    .map_or(true, |topic| e.problem.topic == topic)
            })
            .map(|e| KbMatch::new(e.problem.clone(), query_vector.cosine(&e.vector)))
            .filter(|m| m.score > 0.0 && m.score >= params.score_threshold)
            .collect();

        // Stable sort keeps insertion order for equal scores.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(params.top_k);
        matches
    }
}

#[async_trait]
impl KnowledgeBaseProvider for InMemoryKnowledgeBase {
    async fn search(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<KbMatch>, ProviderError> {
        let params = params.clone().clamped();
        let matches = self.rank(query, &params);
        tracing::debug!(count = matches.len(), "Knowledge base search complete");
        Ok(matches)
    }
}
