//! Answer screening and sanitization.

use regex::Regex;

use super::{GuardOutcome, GuardVerdict, GuardrailError, TermSet};

/// Responses shorter than this (in characters, after trimming) are rejected.
pub const MIN_RESPONSE_CHARS: usize = 10;

/// Responses longer than this must mention some math vocabulary.
pub const LONG_RESPONSE_CHARS: usize = 100;

const HARMFUL_TERMS: &[&str] = &[
    "hack", "crack", "exploit", "weapon", "bomb", "explosive", "drug", "narcotic",
    "substance abuse", "suicide", "self-harm", "kill yourself", "racist", "sexist",
    "homophobic",
];

const LOW_QUALITY_PATTERNS: &[&str] = &[
    r"^(?:I don't know|I cannot|I'm unable)",
    r"(?i)\b(?:error|failed|could not)\b",
];

const MATH_VOCABULARY: &[&str] = &[
    "step", "solve", "equation", "answer", "calculate", "formula", "theorem", "proof",
    "solution",
];

const URL_PATTERN: &str = r#"https?://[^\s<>"')\]]+"#;
const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PHONE_PATTERN: &str = r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b";

/// Checks generated answers before they reach the user.
#[derive(Debug, Clone)]
pub struct OutputGuard {
    harmful: TermSet,
    low_quality: Vec<Regex>,
    url: Regex,
    email: Regex,
    phone: Regex,
}

impl OutputGuard {
    /// Create a guard with the built-in patterns.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::InvalidPattern` if a pattern fails to compile.
    pub fn new() -> Result<Self, GuardrailError> {
        Ok(Self {
            harmful: TermSet::new(HARMFUL_TERMS)?,
            low_quality: LOW_QUALITY_PATTERNS
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?,
            url: Regex::new(URL_PATTERN)?,
            email: Regex::new(EMAIL_PATTERN)?,
            phone: Regex::new(PHONE_PATTERN)?,
        })
    }

    /// Check a response for safety and quality.
    #[must_use]
    pub fn validate(&self, response: &str) -> GuardVerdict {
        if response.trim().chars().count() < MIN_RESPONSE_CHARS {
            return GuardVerdict::new(GuardOutcome::Rejected, "Response is too short or empty.");
        }

        if self.harmful.is_match(response) {
            tracing::error!("Blocked harmful content in response");
            return GuardVerdict::new(
                GuardOutcome::Rejected,
                "Response contains inappropriate or harmful content.",
            );
        }

        if self.low_quality.iter().any(|p| p.is_match(response)) {
            tracing::warn!("Response flagged as low quality");
            return GuardVerdict::new(GuardOutcome::Warning, "Response quality is below threshold.");
        }

        let lower = response.to_lowercase();
        let has_math_content = MATH_VOCABULARY.iter().any(|term| lower.contains(term));
        if !has_math_content && response.chars().count() > LONG_RESPONSE_CHARS {
            tracing::warn!("Response lacks mathematical content");
            return GuardVerdict::new(GuardOutcome::Warning, "Response may not be math-related.");
        }

        GuardVerdict::new(
            GuardOutcome::Approved,
            "Response validated as safe and appropriate.",
        )
    }

    /// Mask URLs, e-mail addresses and phone numbers.
    #[must_use]
    pub fn sanitize(&self, response: &str) -> String {
        let sanitized = self.url.replace_all(response, "[URL removed]");
        let sanitized = self.email.replace_all(&sanitized, "[email removed]");
        self.phone
            .replace_all(&sanitized, "[phone removed]")
            .into_owned()
    }
}
