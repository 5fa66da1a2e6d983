//! Escalation stages: capability-tagged bindings of providers.
//!
//! A stage that accepts knowledge-base context serves the analysis tier; a
//! stage that handles bare questions serves the web-search tier. Binding both
//! capabilities to one provider collapses the two tiers into a single
//! resolve step.

use std::fmt;
use std::sync::Arc;

use super::provider::{AnalysisProvider, WebSearchProvider};

/// One entry in the engine's ordered escalation chain.
#[derive(Clone)]
pub struct EscalationStage {
    label: String,
    analysis: Option<Arc<dyn AnalysisProvider>>,
    web_search: Option<Arc<dyn WebSearchProvider>>,
}

impl EscalationStage {
    /// Stage that only answers with knowledge-base context.
    #[must_use]
    pub fn analysis(label: impl Into<String>, provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            label: label.into(),
            analysis: Some(provider),
            web_search: None,
        }
    }

    /// Stage that only answers bare questions.
    #[must_use]
    pub fn web_search(label: impl Into<String>, provider: Arc<dyn WebSearchProvider>) -> Self {
        Self {
            label: label.into(),
            analysis: None,
            web_search: Some(provider),
        }
    }

    /// Stage where one provider serves both capabilities.
    #[must_use]
    pub fn unified<P>(label: impl Into<String>, provider: Arc<P>) -> Self
    where
        P: AnalysisProvider + WebSearchProvider + 'static,
    {
        let analysis: Arc<dyn AnalysisProvider> = provider.clone();
        let web_search: Arc<dyn WebSearchProvider> = provider;
        Self {
            label: label.into(),
            analysis: Some(analysis),
            web_search: Some(web_search),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn accepts_context(&self) -> bool {
        self.analysis.is_some()
    }

    #[must_use]
    pub fn handles_bare(&self) -> bool {
        self.web_search.is_some()
    }

    pub(super) fn analysis_provider(&self) -> Option<&Arc<dyn AnalysisProvider>> {
        self.analysis.as_ref()
    }

    pub(super) fn web_search_provider(&self) -> Option<&Arc<dyn WebSearchProvider>> {
        self.web_search.as_ref()
    }

    /// Source tag for answers grounded in a knowledge-base match.
    #[must_use]
    pub fn context_tag(&self) -> String {
        format!("{}_with_db", self.label)
    }

    /// Source tag for answers from bare web search.
    #[must_use]
    pub fn web_tag(&self) -> String {
        format!("{}_web", self.label)
    }
}

impl fmt::Debug for EscalationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationStage")
            .field("label", &self.label)
            .field("accepts_context", &self.accepts_context())
            .field("handles_bare", &self.handles_bare())
            .finish()
    }
}
