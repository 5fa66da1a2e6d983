//! Whole-word term matching.

use regex::Regex;

use super::GuardrailError;

/// A case-insensitive set of terms matched on word boundaries.
///
/// Plural forms (`-s`, `-es`) match too, so `derivative` covers
/// `derivatives`, while `harm` does not fire on `harmonic`.
#[derive(Debug, Clone)]
pub struct TermSet {
    terms: Vec<String>,
    pattern: Option<Regex>,
}

impl TermSet {
    /// Compile a term set.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::InvalidPattern` if the combined pattern fails
    /// to compile (for instance because it exceeds the regex size limit).
    pub fn new<I, S>(terms: I) -> Result<Self, GuardrailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        terms.sort();
        terms.dedup();

        if terms.is_empty() {
            return Ok(Self {
                terms,
                pattern: None,
            });
        }

        // Longest first so multi-word terms win over their prefixes.
        let mut alternatives: Vec<&String> = terms.iter().collect();
        alternatives.sort_by_key(|t| std::cmp::Reverse(t.len()));
        let alternation = alternatives
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})(?:s|es)?\b"))?;
        Ok(Self {
            terms,
            pattern: Some(pattern),
        })
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    /// Distinct matched words, lower-cased, in order of first appearance.
    #[must_use]
    pub fn find_all(&self, text: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        let mut found: Vec<String> = Vec::new();
        for m in pattern.find_iter(text) {
            let word = m.as_str().to_lowercase();
            if !found.contains(&word) {
                found.push(word);
            }
        }
        found
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
