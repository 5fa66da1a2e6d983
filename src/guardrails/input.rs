//! Question screening.

use regex::Regex;
use serde::Serialize;

use crate::config::GuardrailsConfig;

use super::{GuardOutcome, GuardVerdict, GuardrailError, TermSet};

/// Questions shorter than this (in characters, after trimming) are rejected.
pub const MIN_QUESTION_CHARS: usize = 5;

const REPORT_LIMIT: usize = 5;

const MATH_KEYWORDS: &[&str] = &[
    // Topics
    "calculus", "algebra", "geometry", "trigonometry", "probability", "statistics",
    "arithmetic", "mathematics", "math", "number", "equation", "function", "variable",
    "constant",
    // Operations
    "solve", "evaluate", "calculate", "compute", "find", "determine", "simplify", "expand",
    "factor", "integrate", "differentiate", "derive", "prove", "verify", "show",
    // Calculus
    "derivative", "integral", "limit", "series", "differential", "partial", "gradient",
    "optimization", "convergence",
    // Algebra
    "polynomial", "quadratic", "cubic", "linear", "exponential", "logarithm",
    "logarithmic", "radical", "rational", "irrational", "root", "solution", "inequality",
    "system", "matrix", "determinant", "vector",
    // Geometry
    "triangle", "circle", "rectangle", "polygon", "angle", "area", "perimeter", "volume",
    "surface", "coordinate", "distance", "slope",
    // Trigonometry
    "sine", "cosine", "tangent", "secant", "cosecant", "cotangent", "sin", "cos", "tan",
    "sec", "csc", "cot", "radian", "degree",
    // Probability
    "permutation", "combination", "distribution", "random", "expected", "variance", "mean",
    "median", "mode",
    // Notation
    "pi", "sigma", "theta", "delta", "alpha", "beta", "gamma", "infinity", "sum", "product",
    // Numbers
    "prime", "composite", "fraction", "decimal", "integer", "real", "complex", "imaginary",
];

const PROHIBITED_TERMS: &[&str] = &[
    // Off-topic
    "weather", "recipe", "movie", "music", "sports", "politics", "celebrity", "news",
    "shopping", "dating", "social media",
    // Harmful
    "hack", "crack", "pirate", "illegal", "weapon", "drug", "violence", "harm", "dangerous",
    "explosive",
    // Inappropriate
    "adult", "nsfw", "explicit", "profanity",
];

const MATH_SYMBOLS: &[char] = &[
    '=', '+', '-', '*', '/', '^', '√', '∫', '∂', '∑', '∏', 'Δ', '∇', '≤', '≥', '≠', '≈',
    '∈', '∉', '⊂', '⊃', '∪', '∩', '∅', '∞', 'α', 'β', 'γ', 'θ', 'λ', 'μ', 'π', 'σ', 'φ',
    'ω', '²', '³', '⁴', '⁵', '₁', '₂', '₃',
];

const EXPRESSION_PATTERNS: &[&str] = &[
    r"[a-zA-Z]\s*[+\-*/^]\s*\d", // x+2, y*3
    r"\d\s*[a-zA-Z]",            // 2x, 3y
    r"\([a-zA-Z]\)",             // f(x)
    r"[a-zA-Z]\^",               // x^
    r"\\[a-zA-Z]+",              // LaTeX commands
];

const INDICATOR_COUNT: usize = 4;

/// Which of the four math indicators a question shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Indicators {
    keyword: bool,
    symbol: bool,
    digit: bool,
    expression: bool,
}

impl Indicators {
    fn count(self) -> usize {
        [self.keyword, self.symbol, self.digit, self.expression]
            .into_iter()
            .filter(|&hit| hit)
            .count()
    }

    #[allow(clippy::cast_precision_loss)]
    fn ratio(self) -> f64 {
        self.count() as f64 / INDICATOR_COUNT as f64
    }
}

/// Detailed breakdown of a question check.
#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    pub verdict: GuardVerdict,
    pub question_length: usize,
    pub matched_keywords: Vec<String>,
    pub matched_symbols: Vec<char>,
    pub prohibited_terms: Vec<String>,
    pub has_digits: bool,
    pub indicators: usize,
}

/// Decides whether a question is on-topic enough to resolve.
#[derive(Debug, Clone)]
pub struct InputGuard {
    keywords: TermSet,
    prohibited: TermSet,
    expressions: Vec<Regex>,
    acceptance_ratio: f64,
}

impl InputGuard {
    /// Create a guard with the built-in vocabularies.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::InvalidPattern` if a pattern fails to compile.
    pub fn with_defaults() -> Result<Self, GuardrailError> {
        Self::from_config(&GuardrailsConfig::default())
    }

    /// Create a guard with the built-in vocabularies plus configured additions.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::InvalidPattern` if a pattern fails to compile.
    pub fn from_config(config: &GuardrailsConfig) -> Result<Self, GuardrailError> {
        let mut keywords: Vec<&str> = MATH_KEYWORDS.to_vec();
        keywords.extend(config.extra_keywords.iter().map(String::as_str));
        let mut prohibited: Vec<&str> = PROHIBITED_TERMS.to_vec();
        prohibited.extend(config.extra_prohibited_terms.iter().map(String::as_str));

        let keywords = TermSet::new(keywords)?;
        let prohibited = TermSet::new(prohibited)?;
        let expressions = EXPRESSION_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keywords,
            prohibited,
            expressions,
            acceptance_ratio: config.acceptance_ratio.clamp(0.0, 1.0),
        })
    }

    fn indicators(&self, question: &str) -> Indicators {
        Indicators {
            keyword: self.keywords.is_match(question),
            symbol: question.chars().any(|c| MATH_SYMBOLS.contains(&c)),
            digit: question.chars().any(|c| c.is_ascii_digit()),
            expression: self.expressions.iter().any(|p| p.is_match(question)),
        }
    }

    /// Check a question.
    #[must_use]
    pub fn validate(&self, question: &str) -> GuardVerdict {
        if question.trim().chars().count() < MIN_QUESTION_CHARS {
            return GuardVerdict::new(
                GuardOutcome::Rejected,
                "Question is too short. Please provide a meaningful math question.",
            );
        }

        if let Some(term) = self.prohibited.find_all(question).first() {
            tracing::warn!(term = %term, "Rejected question containing prohibited term");
            return GuardVerdict::new(
                GuardOutcome::Rejected,
                "This question appears to be off-topic or inappropriate. \
                 Please ask a mathematics-related question.",
            );
        }

        let indicators = self.indicators(question);
        let ratio = indicators.ratio();

        if ratio >= self.acceptance_ratio {
            tracing::debug!(ratio, "Question approved");
            GuardVerdict::new(GuardOutcome::Approved, "Question validated as math-related.")
        } else if indicators.count() > 0 {
            tracing::warn!(ratio, "Question is borderline");
            GuardVerdict::new(
                GuardOutcome::Warning,
                "Question may not be math-related, but will process. \
                 For best results, include mathematical terms or symbols.",
            )
        } else {
            tracing::warn!(ratio, "Rejected question with low math relevance");
            GuardVerdict::new(
                GuardOutcome::Rejected,
                "This doesn't appear to be a mathematics question. \
                 Please ask about calculus, algebra, geometry, probability, or other math topics.",
            )
        }
    }

    /// Check a question and explain which signals fired.
    #[must_use]
    pub fn report(&self, question: &str) -> InputReport {
        let mut matched_keywords = self.keywords.find_all(question);
        matched_keywords.truncate(REPORT_LIMIT);

        let mut matched_symbols: Vec<char> = Vec::new();
        for c in question.chars() {
            if MATH_SYMBOLS.contains(&c) && !matched_symbols.contains(&c) {
                matched_symbols.push(c);
            }
        }
        matched_symbols.truncate(REPORT_LIMIT);

        let indicators = self.indicators(question);
        InputReport {
            verdict: self.validate(question),
            question_length: question.chars().count(),
            matched_keywords,
            matched_symbols,
            prohibited_terms: self.prohibited.find_all(question),
            has_digits: indicators.digit,
            indicators: indicators.count(),
        }
    }
}
