//! JSON-file feedback log.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::{
    FeedbackEntry, FeedbackError, FeedbackStatistics, FeedbackSubmission, FeedbackType,
    NegativeSummary, Priority, Rating, Recommendation, RecommendationKind,
};

/// Topic keywords looked for in negatively rated questions.
const SUMMARY_TOPICS: [&str; 5] = [
    "calculus",
    "algebra",
    "geometry",
    "probability",
    "trigonometry",
];

const MAX_RECOMMENDATIONS: usize = 5;

/// A topic needs this many negative ratings before it is flagged.
const TOPIC_FLAG_THRESHOLD: usize = 2;

const UNKNOWN_SOURCE: &str = "unknown";

/// Append-only feedback log persisted as a JSON array.
#[derive(Debug)]
pub struct FeedbackStore {
    entries: Vec<FeedbackEntry>,
    path: PathBuf,
}

impl FeedbackStore {
    /// Open the log at `path`. A missing or corrupt file starts an empty log.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Vec<FeedbackEntry>>(&content) {
                Ok(entries) => {
                    tracing::debug!(count = entries.len(), "Loaded feedback entries");
                    entries
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Corrupt feedback file, starting fresh");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No feedback file found");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read feedback file");
                Vec::new()
            }
        };

        Self { entries, path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record feedback and persist the log.
    ///
    /// The entry is not kept if saving fails.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` if the log cannot be written.
    pub async fn submit(
        &mut self,
        submission: FeedbackSubmission,
    ) -> Result<FeedbackEntry, FeedbackError> {
        let id = self.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let feedback_type = FeedbackType::derive(
            submission.correction.as_deref(),
            submission.comment.as_deref(),
        );

        let entry = FeedbackEntry {
            id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            question: submission.question,
            answer: submission.answer,
            rating: submission.rating,
            feedback_type,
            correction: submission.correction,
            comment: submission.comment,
            metadata: submission.metadata,
        };

        self.entries.push(entry.clone());
        if let Err(e) = self.save().await {
            self.entries.pop();
            return Err(e);
        }

        tracing::info!(id, rating = %entry.rating, "Recorded feedback");
        Ok(entry)
    }

    /// Save the log to disk atomically (temp file + sync + rename).
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` if file operations fail.
    pub async fn save(&self) -> Result<(), FeedbackError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;

        let temp_path = self.path.with_extension("json.tmp");
        let written = match write_synced(&temp_path, json.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&temp_path, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                tracing::debug!(error = %cleanup, "No temp feedback file to remove");
            }
            return Err(e.into());
        }

        tracing::debug!(
            path = %self.path.display(),
            count = self.entries.len(),
            "Saved feedback file"
        );
        Ok(())
    }

    #[must_use]
    pub fn by_rating(&self, rating: Rating) -> Vec<&FeedbackEntry> {
        self.entries.iter().filter(|e| e.rating == rating).collect()
    }

    #[must_use]
    pub fn positive(&self) -> Vec<&FeedbackEntry> {
        self.by_rating(Rating::ThumbsUp)
    }

    #[must_use]
    pub fn negative(&self) -> Vec<&FeedbackEntry> {
        self.by_rating(Rating::ThumbsDown)
    }

    #[must_use]
    pub fn with_corrections(&self) -> Vec<&FeedbackEntry> {
        self.entries.iter().filter(|e| e.has_correction()).collect()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn statistics(&self) -> FeedbackStatistics {
        let total = self.entries.len();
        let positive = self.positive().len();
        let negative = self.negative().len();
        let with_corrections = self.with_corrections().len();

        let rate = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };

        FeedbackStatistics {
            total_feedback: total,
            positive,
            negative,
            positive_rate: rate(positive),
            negative_rate: rate(negative),
            with_corrections,
            correction_rate: rate(with_corrections),
        }
    }

    /// Group negative feedback by source tag and topic keyword.
    #[must_use]
    pub fn negative_summary(&self) -> NegativeSummary {
        let negative = self.negative();
        if negative.is_empty() {
            return NegativeSummary::default();
        }

        let mut sources: BTreeMap<String, usize> = BTreeMap::new();
        let mut topics: BTreeMap<String, usize> = BTreeMap::new();

        for entry in &negative {
            let source = entry
                .metadata
                .source
                .clone()
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
            *sources.entry(source).or_default() += 1;

            let question = entry.question.to_lowercase();
            for topic in SUMMARY_TOPICS {
                if question.contains(topic) {
                    *topics.entry(topic.to_string()).or_default() += 1;
                }
            }
        }

        let recommendations = recommend(&sources, &topics);
        NegativeSummary {
            total_negative: negative.len(),
            sources,
            topics,
            recommendations,
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_data().await
}

fn count_matching(sources: &BTreeMap<String, usize>, suffix: &str) -> usize {
    sources
        .iter()
        .filter(|(tag, _)| tag.ends_with(suffix))
        .map(|(_, count)| count)
        .sum()
}

fn recommend(
    sources: &BTreeMap<String, usize>,
    topics: &BTreeMap<String, usize>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let web = count_matching(sources, "_web");
    let knowledge_base = count_matching(sources, "_with_db");
    if web > knowledge_base {
        recommendations.push(Recommendation {
            kind: RecommendationKind::ExpandKnowledgeBase,
            priority: Priority::High,
            reason: "More negative feedback from web search than knowledge-base matches"
                .to_string(),
            action: "Add more problems to the knowledge base".to_string(),
        });
    }

    let not_found = sources
        .get(crate::workflow::NOT_FOUND_TAG)
        .copied()
        .unwrap_or(0);
    if not_found > 0 {
        recommendations.push(Recommendation {
            kind: RecommendationKind::ImproveSearch,
            priority: Priority::High,
            reason: format!("{not_found} queries not answered"),
            action: "Improve retrieval or lower the score threshold".to_string(),
        });
    }

    let mut ranked: Vec<(&String, &usize)> = topics.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));
    for (topic, &count) in ranked {
        if count >= TOPIC_FLAG_THRESHOLD {
            recommendations.push(Recommendation {
                kind: RecommendationKind::TopicCoverage,
                priority: Priority::Medium,
                reason: format!("{count} negative feedback for {topic} questions"),
                action: format!("Add more {topic} problems to the knowledge base"),
            });
        }
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackMetadata;

    fn negative(question: &str, source: &str) -> FeedbackSubmission {
        FeedbackSubmission {
            metadata: FeedbackMetadata {
                source: Some(source.to_string()),
                ..FeedbackMetadata::default()
            },
            ..FeedbackSubmission::new(question, "answer", Rating::ThumbsDown)
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("feedback.json")).await;
        assert!(store.is_empty());
        assert_eq!(store.statistics(), FeedbackStatistics::default());
    }

    #[tokio::test]
    async fn test_failed_save_removes_temp_file_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the log makes the final rename fail.
        let path = dir.path().join("feedback.json");
        std::fs::create_dir(&path).unwrap();
        let mut store = FeedbackStore::open(&path).await;

        let result = store
            .submit(FeedbackSubmission::new("Q1", "A1", Rating::ThumbsUp))
            .await;

        assert!(matches!(result, Err(FeedbackError::Io(_))));
        assert!(store.is_empty());
        assert!(!dir.path().join("feedback.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_open_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FeedbackStore::open(&path).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_submit_assigns_sequential_ids_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feedback.json");
        let mut store = FeedbackStore::open(&path).await;

        let first = store
            .submit(FeedbackSubmission::new("Q1", "A1", Rating::ThumbsUp))
            .await
            .unwrap();
        let second = store
            .submit(
                FeedbackSubmission::new("Q2", "A2", Rating::ThumbsDown).with_correction("x = 3"),
            )
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(first.feedback_type, FeedbackType::Rating);
        assert_eq!(second.id, 2);
        assert_eq!(second.feedback_type, FeedbackType::Correction);
        assert!(chrono::DateTime::parse_from_rfc3339(&second.timestamp).is_ok());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = FeedbackStore::open(&path).await;
        assert_eq!(reopened.entries(), store.entries());
    }

    #[tokio::test]
    async fn test_statistics_rates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FeedbackStore::open(dir.path().join("feedback.json")).await;

        for rating in [Rating::ThumbsUp, Rating::ThumbsUp, Rating::ThumbsUp, Rating::ThumbsDown] {
            store
                .submit(FeedbackSubmission::new("Q", "A", rating))
                .await
                .unwrap();
        }
        store
            .submit(FeedbackSubmission::new("Q", "A", Rating::ThumbsDown).with_correction("B"))
            .await
            .unwrap();

        let stats = store.statistics();
        assert_eq!(stats.total_feedback, 5);
        assert_eq!(stats.positive, 3);
        assert_eq!(stats.negative, 2);
        assert!((stats.positive_rate - 0.6).abs() < 1e-9);
        assert!((stats.negative_rate - 0.4).abs() < 1e-9);
        assert_eq!(stats.with_corrections, 1);
        assert!((stats.correction_rate - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_negative_summary_recommendations() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FeedbackStore::open(dir.path().join("feedback.json")).await;

        store
            .submit(negative("A calculus limit question", "perplexity_web"))
            .await
            .unwrap();
        store
            .submit(negative("Another calculus integral", "perplexity_web"))
            .await
            .unwrap();
        store
            .submit(negative("Algebra puzzle", "gemini_with_db"))
            .await
            .unwrap();
        store
            .submit(negative("Obscure geometry", "not_found"))
            .await
            .unwrap();
        store
            .submit(FeedbackSubmission::new("Good one", "A", Rating::ThumbsUp))
            .await
            .unwrap();

        let summary = store.negative_summary();
        assert_eq!(summary.total_negative, 4);
        assert_eq!(summary.sources["perplexity_web"], 2);
        assert_eq!(summary.sources["gemini_with_db"], 1);
        assert_eq!(summary.topics["calculus"], 2);
        assert_eq!(summary.topics["geometry"], 1);

        let kinds: Vec<_> = summary.recommendations.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::ExpandKnowledgeBase,
                RecommendationKind::ImproveSearch,
                RecommendationKind::TopicCoverage,
            ]
        );
        assert_eq!(summary.recommendations[1].reason, "1 queries not answered");
    }

    #[tokio::test]
    async fn test_negative_summary_unknown_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FeedbackStore::open(dir.path().join("feedback.json")).await;
        store
            .submit(FeedbackSubmission::new("Q", "A", Rating::ThumbsDown))
            .await
            .unwrap();

        let summary = store.negative_summary();
        assert_eq!(summary.sources["unknown"], 1);
        assert!(summary.recommendations.is_empty());
    }

    #[test]
    fn test_recommendations_capped() {
        let sources = BTreeMap::from([
            ("perplexity_web".to_string(), 3),
            ("not_found".to_string(), 1),
        ]);
        let topics: BTreeMap<String, usize> = SUMMARY_TOPICS
            .iter()
            .map(|t| ((*t).to_string(), 2))
            .collect();

        let recs = recommend(&sources, &topics);
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
    }
}
