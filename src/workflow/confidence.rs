//! Confidence banding for knowledge-base similarity scores.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::knowledge::KbMatch;

/// Lower edge of the `High` band.
pub const HIGH_THRESHOLD: f64 = 0.85;
/// Lower edge of the `Medium` band.
pub const MEDIUM_THRESHOLD: f64 = 0.70;
/// Lower edge of the `Low` band.
pub const LOW_THRESHOLD: f64 = 0.50;

/// Discrete classification of a similarity score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

/// Map a similarity score to its band. Lower edges are inclusive; NaN maps to `None`.
#[must_use]
pub fn band_for(score: f64) -> ConfidenceBand {
    if score >= HIGH_THRESHOLD {
        ConfidenceBand::High
    } else if score >= MEDIUM_THRESHOLD {
        ConfidenceBand::Medium
    } else if score >= LOW_THRESHOLD {
        ConfidenceBand::Low
    } else {
        ConfidenceBand::None
    }
}

/// Confidence of a rank-ordered result set, taken from its first entry.
#[must_use]
pub fn retrieval_confidence(matches: &[KbMatch]) -> (ConfidenceBand, f64) {
    match matches.first() {
        Some(best) => (band_for(best.score), best.score),
        None => (ConfidenceBand::None, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Problem;

    fn scored(id: &str, score: f64) -> KbMatch {
        KbMatch::new(
            Problem {
                problem_id: id.to_string(),
                question: String::new(),
                solution_steps: Vec::new(),
                final_answer: String::new(),
                difficulty: "JEE_Main".to_string(),
                tags: Vec::new(),
                topic: "Algebra".to_string(),
            },
            score,
        )
    }

    #[test]
    fn test_band_lower_edges_are_inclusive() {
        assert_eq!(band_for(0.85), ConfidenceBand::High);
        assert_eq!(band_for(0.70), ConfidenceBand::Medium);
        assert_eq!(band_for(0.50), ConfidenceBand::Low);
    }

    #[test]
    fn test_band_just_below_edges() {
        assert_eq!(band_for(0.849_999), ConfidenceBand::Medium);
        assert_eq!(band_for(0.699_999), ConfidenceBand::Low);
        assert_eq!(band_for(0.499_999), ConfidenceBand::None);
    }

    #[test]
    fn test_band_extremes() {
        assert_eq!(band_for(1.0), ConfidenceBand::High);
        assert_eq!(band_for(0.0), ConfidenceBand::None);
        assert_eq!(band_for(f64::NAN), ConfidenceBand::None);
    }

    #[test]
    fn test_bands_are_ordered() {
        assert!(ConfidenceBand::None < ConfidenceBand::Low);
        assert!(ConfidenceBand::Low < ConfidenceBand::Medium);
        assert!(ConfidenceBand::Medium < ConfidenceBand::High);
    }

    #[test]
    fn test_retrieval_confidence_empty() {
        let (band, score) = retrieval_confidence(&[]);
        assert_eq!(band, ConfidenceBand::None);
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_retrieval_confidence_uses_first_match() {
        // Provider order wins even when a later entry scores the same.
        let matches = vec![scored("a", 0.72), scored("b", 0.72), scored("c", 0.6)];
        let (band, score) = retrieval_confidence(&matches);
        assert_eq!(band, ConfidenceBand::Medium);
        assert!((score - 0.72).abs() < f64::EPSILON);
    }

    #[test]
    fn test_band_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConfidenceBand::High).unwrap(),
            "\"high\""
        );
        assert_eq!(ConfidenceBand::Medium.to_string(), "medium");
    }
}
