//! Tiered, confidence-gated resolution engine.
//!
//! `SEARCH_KB` always runs first. A knowledge-base hit at or above the
//! escalation gate goes to the first stage that accepts context; anything
//! else goes to the first stage that handles bare questions, and a failed
//! bare search ends in `NOT_FOUND`. An analysis failure on a hit terminates
//! as `ANALYSIS_FAILED` without escalating.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::error::{ConfigurationError, ProviderError};

use super::confidence::{retrieval_confidence, ConfidenceBand};
use super::context::{build_context, format_similarity};
use super::provider::{KnowledgeBaseProvider, SearchParams, WebSearchProvider};
use super::stage::EscalationStage;
use super::state::{
    ErrorInfo, ResolutionEnvelope, ResolutionRequest, ResolutionState, Source, Tier,
    ANALYSIS_FAILED_TAG, NOT_FOUND_MESSAGE, NOT_FOUND_TAG,
};

/// Case-insensitive phrases that mark a web-search reply as a failure.
///
/// This can misfire on genuine answers that mention e.g. "error analysis".
pub const WEB_FAILURE_MARKERS: [&str; 3] = ["failed", "error", "missing"];

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    /// Matches requested from the knowledge base.
    pub top_k: usize,
    /// Minimum score the knowledge base should return.
    pub score_threshold: f64,
    /// Best-match score required to use a match as context. Independent of
    /// the confidence bands.
    pub escalation_gate: f64,
    /// Limit applied to every provider call.
    pub provider_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            score_threshold: 0.5,
            escalation_gate: 0.5,
            provider_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkflowSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("score_threshold", self.score_threshold),
            ("escalation_gate", self.escalation_gate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidThreshold { name, value });
            }
        }
        if self.provider_timeout.is_zero() {
            return Err(ConfigurationError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Routing decision after the knowledge-base search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRoute {
    AnalyzeWithContext,
    WebSearch,
    NotFound,
}

/// Routing decision after the bare web search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebRoute {
    Done,
    NotFound,
}

/// Whether a web-search reply should be treated as "no answer".
#[must_use]
pub fn is_failure_response(response: &str) -> bool {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    WEB_FAILURE_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Builder for [`WorkflowEngine`].
pub struct WorkflowEngineBuilder {
    knowledge_base: Arc<dyn KnowledgeBaseProvider>,
    stages: Vec<EscalationStage>,
    settings: WorkflowSettings,
}

impl WorkflowEngineBuilder {
    #[must_use]
    pub fn settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Append a stage to the escalation chain.
    #[must_use]
    pub fn stage(mut self, stage: EscalationStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Finish the engine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if no stage was added or the settings are
    /// out of range.
    pub fn build(self) -> Result<WorkflowEngine, ConfigurationError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::NoEscalationStages);
        }
        self.settings.validate()?;
        Ok(WorkflowEngine {
            knowledge_base: self.knowledge_base,
            stages: self.stages,
            settings: self.settings,
        })
    }
}

/// Sequences knowledge-base search, analysis, web search and not-found.
///
/// The engine holds no per-request state, so concurrent `resolve()` calls
/// need no coordination.
pub struct WorkflowEngine {
    knowledge_base: Arc<dyn KnowledgeBaseProvider>,
    stages: Vec<EscalationStage>,
    settings: WorkflowSettings,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("stages", &self.stages)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    #[must_use]
    pub fn builder(knowledge_base: Arc<dyn KnowledgeBaseProvider>) -> WorkflowEngineBuilder {
        WorkflowEngineBuilder {
            knowledge_base,
            stages: Vec::new(),
            settings: WorkflowSettings::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    #[must_use]
    pub fn stages(&self) -> &[EscalationStage] {
        &self.stages
    }

    fn context_stage(&self) -> Option<&EscalationStage> {
        self.stages.iter().find(|s| s.accepts_context())
    }

    fn bare_stage(&self) -> Option<&EscalationStage> {
        self.stages.iter().find(|s| s.handles_bare())
    }

    async fn with_timeout<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let limit = self.settings.provider_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(ProviderError::Timeout(limit)))
    }

    /// Resolve a question into an answer envelope.
    ///
    /// Provider failures never surface here; they end up in the envelope's
    /// `error` and `note`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyQuestion` for a blank question.
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<ResolutionEnvelope, ConfigurationError> {
        request.validate()?;

        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("resolve", %request_id);

        async move {
            tracing::info!(question = %request.question, "Starting resolution");
            let state = self.run(ResolutionState::new(request)).await;
            tracing::info!(
                source = ?state.source,
                tag = state.source_tag.as_deref().unwrap_or_default(),
                confidence = %state.confidence,
                score = state.confidence_score,
                "Resolution complete"
            );
            Ok(state.into_envelope())
        }
        .instrument(span)
        .await
    }

    async fn run(&self, state: ResolutionState) -> ResolutionState {
        let state = self.search_knowledge_base(state).await;

        match self.route_after_search(&state) {
            SearchRoute::AnalyzeWithContext => {
                let state = self.analyze_with_context(state).await;
                if state.source.is_terminal() {
                    state
                } else {
                    self.not_found(state)
                }
            }
            SearchRoute::WebSearch => {
                let state = self.web_search(state).await;
                match self.route_after_web_search(&state) {
                    WebRoute::Done => state,
                    WebRoute::NotFound => self.not_found(state),
                }
            }
            SearchRoute::NotFound => self.not_found(state),
        }
    }

    /// `SEARCH_KB`: query the knowledge base and score the best match.
    ///
    /// A provider failure is recorded and treated as an empty result set.
    pub async fn search_knowledge_base(&self, mut state: ResolutionState) -> ResolutionState {
        let params =
            SearchParams::new(self.settings.top_k, self.settings.score_threshold).clamped();
        tracing::info!(
            top_k = params.top_k,
            threshold = params.score_threshold,
            "Searching knowledge base"
        );

        match self
            .with_timeout(self.knowledge_base.search(&state.question, &params))
            .await
        {
            Ok(matches) => {
                let (confidence, score) = retrieval_confidence(&matches);
                state.best_match = matches.first().cloned();
                state.kb_matches = matches;
                state.confidence = confidence;
                state.confidence_score = score;
                state.last_error = None;
                match &state.best_match {
                    Some(best) => tracing::info!(
                        matches = state.kb_matches.len(),
                        best = %best.problem_id(),
                        score,
                        "Knowledge base returned matches"
                    ),
                    None => tracing::info!("No knowledge base matches"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Knowledge base search failed, treating as no match");
                state.kb_matches = Vec::new();
                state.best_match = None;
                state.confidence = ConfidenceBand::None;
                state.confidence_score = 0.0;
                state.last_error = Some(ErrorInfo::transport(Tier::KnowledgeBase, &e));
            }
        }

        state
    }

    /// Decide between analysis with context, bare web search, and not found.
    #[must_use]
    pub fn route_after_search(&self, state: &ResolutionState) -> SearchRoute {
        let hit = !state.kb_matches.is_empty()
            && state.confidence_score >= self.settings.escalation_gate;

        let route = if hit && self.context_stage().is_some() {
            SearchRoute::AnalyzeWithContext
        } else if self.bare_stage().is_some() {
            SearchRoute::WebSearch
        } else {
            SearchRoute::NotFound
        };

        tracing::debug!(
            hit,
            score = state.confidence_score,
            gate = self.settings.escalation_gate,
            route = ?route,
            "Routing after knowledge base search"
        );
        route
    }

    /// `ANALYZE-WITH-CONTEXT`: answer from the best match.
    ///
    /// Terminal in both outcomes. Without a best match or a context stage the
    /// state is returned untouched.
    pub async fn analyze_with_context(&self, mut state: ResolutionState) -> ResolutionState {
        let (Some(best), Some(stage)) = (state.best_match.clone(), self.context_stage()) else {
            tracing::debug!("Analysis skipped: no match or no context stage");
            return state;
        };
        let Some(provider) = stage.analysis_provider() else {
            return state;
        };

        tracing::info!(
            stage = stage.label(),
            best = %best.problem_id(),
            "Analyzing knowledge base match"
        );

        let context = build_context(&best);
        let outcome = self
            .with_timeout(provider.analyze(&state.question, &context))
            .await
            .and_then(|answer| {
                if answer.trim().is_empty() {
                    Err(ProviderError::ParseError(
                        "analysis provider returned an empty answer".to_string(),
                    ))
                } else {
                    Ok(answer)
                }
            });

        match outcome {
            Ok(answer) => {
                state.source = Source::AnalysisWithKb;
                state.source_tag = Some(stage.context_tag());
                state.analysis_answer = Some(answer.clone());
                state.final_answer = Some(answer);
                state.note = format!(
                    "Answer generated by {} from knowledge base match {} (similarity {})",
                    stage.label(),
                    best.problem_id(),
                    format_similarity(best.score)
                );
                tracing::info!("Analysis complete");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Analysis failed; not escalating");
                state.source = Source::AnalysisFailed;
                state.source_tag = Some(ANALYSIS_FAILED_TAG.to_string());
                state.confidence = ConfidenceBand::None;
                state.confidence_score = 0.0;
                state.analysis_answer = None;
                state.final_answer = Some(format!("Error: {e}"));
                state.last_error = Some(ErrorInfo::transport(Tier::Analysis, &e));
                state.note = format!(
                    "Analysis of knowledge base match {} by {} failed",
                    best.problem_id(),
                    stage.label()
                );
            }
        }

        state
    }

    /// `WEB_SEARCH`: ask the bare-question stage.
    ///
    /// On failure the final answer is cleared so routing goes to not-found.
    pub async fn web_search(&self, mut state: ResolutionState) -> ResolutionState {
        let Some(stage) = self.bare_stage() else {
            tracing::debug!("Web search skipped: no bare stage");
            return state;
        };
        let Some(provider) = stage.web_search_provider() else {
            return state;
        };

        tracing::info!(stage = stage.label(), "Searching the web");

        match self.with_timeout(provider.search(&state.question)).await {
            Ok(response) if !is_failure_response(&response) => {
                state.web_answer = Some(response.clone());
                state.final_answer = Some(response);
                state.source = Source::WebSearch;
                state.source_tag = Some(stage.web_tag());
                state.note = format!(
                    "Answer found via {} web search (not in knowledge base)",
                    stage.label()
                );
                tracing::info!("Web search successful");
            }
            Ok(response) => {
                tracing::info!("Web search returned no usable answer");
                state.final_answer = None;
                state.last_error = Some(ErrorInfo::content(
                    Tier::WebSearch,
                    if response.trim().is_empty() {
                        "empty response".to_string()
                    } else {
                        format!("response signals failure: {}", response.trim())
                    },
                ));
                state.web_answer = Some(response);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Web search failed");
                state.web_answer = None;
                state.final_answer = None;
                state.last_error = Some(ErrorInfo::transport(Tier::WebSearch, &e));
            }
        }

        state
    }

    /// Accept the web answer only if web search produced one.
    #[must_use]
    pub fn route_after_web_search(&self, state: &ResolutionState) -> WebRoute {
        if state.source == Source::WebSearch && state.has_answer() {
            WebRoute::Done
        } else {
            WebRoute::NotFound
        }
    }

    /// `NOT_FOUND`: terminal state when no tier answered.
    #[must_use]
    pub fn not_found(&self, mut state: ResolutionState) -> ResolutionState {
        tracing::info!("No answer found in any tier");
        state.final_answer = Some(NOT_FOUND_MESSAGE.to_string());
        state.confidence = ConfidenceBand::None;
        state.confidence_score = 0.0;
        state.source = Source::NotFound;
        state.source_tag = Some(NOT_FOUND_TAG.to_string());
        state.note = if self.bare_stage().is_some() {
            "No match in the knowledge base and no result from web search".to_string()
        } else {
            "No match in the knowledge base and no web search stage configured".to_string()
        };
        state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::knowledge::{KbMatch, Problem};
    use crate::workflow::provider::{AnalysisProvider, WebSearchProvider};

    fn kb_match(id: &str, score: f64) -> KbMatch {
        KbMatch::new(
            Problem {
                problem_id: id.to_string(),
                question: "Solve for x: x³ - 3x + 2 = 0".to_string(),
                solution_steps: vec!["Factor".to_string()],
                final_answer: "x = 1, x = -2".to_string(),
                difficulty: "JEE_Main".to_string(),
                tags: vec!["polynomial".to_string()],
                topic: "Algebra".to_string(),
            },
            score,
        )
    }

    struct FixedKb(Result<Vec<KbMatch>, ProviderError>);

    #[async_trait]
    impl KnowledgeBaseProvider for FixedKb {
        async fn search(
            &self,
            _query: &str,
            _params: &SearchParams,
        ) -> Result<Vec<KbMatch>, ProviderError> {
            self.0.clone()
        }
    }

    struct Fixed {
        reply: Result<String, ProviderError>,
        contexts: Mutex<Vec<String>>,
    }

    impl Fixed {
        fn new(reply: Result<String, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                contexts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AnalysisProvider for Fixed {
        async fn analyze(&self, _question: &str, context: &str) -> Result<String, ProviderError> {
            self.contexts.lock().unwrap().push(context.to_string());
            self.reply.clone()
        }
    }

    #[async_trait]
    impl WebSearchProvider for Fixed {
        async fn search(&self, _question: &str) -> Result<String, ProviderError> {
            self.reply.clone()
        }
    }

    fn engine(
        kb: Result<Vec<KbMatch>, ProviderError>,
        analysis: Arc<Fixed>,
        web: Arc<Fixed>,
    ) -> WorkflowEngine {
        WorkflowEngine::builder(Arc::new(FixedKb(kb)))
            .stage(EscalationStage::analysis("gemini", analysis))
            .stage(EscalationStage::web_search("perplexity", web))
            .build()
            .unwrap()
    }

    fn initial() -> ResolutionState {
        ResolutionState::new(&ResolutionRequest::new("Solve x^3-3x+2=0"))
    }

    #[test]
    fn test_failure_markers_are_case_insensitive() {
        assert!(is_failure_response("Request FAILED due to timeout"));
        assert!(is_failure_response("API key Missing"));
        assert!(is_failure_response("Internal Error"));
        assert!(is_failure_response(""));
        assert!(is_failure_response("   "));
        assert!(!is_failure_response("x = 2"));
    }

    #[test]
    fn test_build_requires_stage() {
        let result = WorkflowEngine::builder(Arc::new(FixedKb(Ok(Vec::new())))).build();
        assert!(matches!(result, Err(ConfigurationError::NoEscalationStages)));
    }

    #[test]
    fn test_build_rejects_out_of_range_gate() {
        let result = WorkflowEngine::builder(Arc::new(FixedKb(Ok(Vec::new()))))
            .stage(EscalationStage::web_search(
                "perplexity",
                Fixed::new(Ok("x".to_string())),
            ))
            .settings(WorkflowSettings {
                escalation_gate: 1.2,
                ..WorkflowSettings::default()
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidThreshold {
                name: "escalation_gate",
                ..
            })
        ));
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let result = WorkflowEngine::builder(Arc::new(FixedKb(Ok(Vec::new()))))
            .stage(EscalationStage::web_search(
                "perplexity",
                Fixed::new(Ok("x".to_string())),
            ))
            .settings(WorkflowSettings {
                provider_timeout: Duration::ZERO,
                ..WorkflowSettings::default()
            })
            .build();
        assert!(matches!(result, Err(ConfigurationError::ZeroTimeout)));
    }

    #[tokio::test]
    async fn test_search_node_records_kb_error() {
        let engine = engine(
            Err(ProviderError::Unavailable("index offline".to_string())),
            Fixed::new(Ok("unused".to_string())),
            Fixed::new(Ok("unused".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        assert!(state.kb_matches().is_empty());
        assert!(state.best_match().is_none());
        assert_eq!(state.confidence(), ConfidenceBand::None);
        let error = state.last_error().unwrap();
        assert_eq!(error.tier, Tier::KnowledgeBase);
        assert_eq!(engine.route_after_search(&state), SearchRoute::WebSearch);
    }

    #[tokio::test]
    async fn test_gate_is_inclusive() {
        let engine = engine(
            Ok(vec![kb_match("alg_001", 0.5)]),
            Fixed::new(Ok("answer".to_string())),
            Fixed::new(Ok("answer".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        assert_eq!(state.confidence(), ConfidenceBand::Low);
        assert_eq!(
            engine.route_after_search(&state),
            SearchRoute::AnalyzeWithContext
        );
    }

    #[tokio::test]
    async fn test_below_gate_goes_to_web() {
        let engine = engine(
            Ok(vec![kb_match("alg_001", 0.49)]),
            Fixed::new(Ok("answer".to_string())),
            Fixed::new(Ok("answer".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        assert_eq!(engine.route_after_search(&state), SearchRoute::WebSearch);
    }

    #[tokio::test]
    async fn test_analysis_node_passes_context() {
        let analysis = Fixed::new(Ok("x=1 (double), x=-2".to_string()));
        let engine = engine(
            Ok(vec![kb_match("alg_001", 0.92)]),
            analysis.clone(),
            Fixed::new(Ok("unused".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        let state = engine.analyze_with_context(state).await;

        assert_eq!(state.source(), Source::AnalysisWithKb);
        assert_eq!(state.source_tag(), Some("gemini_with_db"));
        assert_eq!(state.analysis_answer(), Some("x=1 (double), x=-2"));
        assert!(state.note().contains("alg_001"));
        assert!(state.note().contains("92.0%"));

        let contexts = analysis.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains("Problem ID: alg_001"));
    }

    #[tokio::test]
    async fn test_analysis_node_rejects_blank_answer() {
        let engine = engine(
            Ok(vec![kb_match("alg_001", 0.92)]),
            Fixed::new(Ok("   ".to_string())),
            Fixed::new(Ok("unused".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        let state = engine.analyze_with_context(state).await;

        assert!(state.final_answer().unwrap().starts_with("Error:"));
        assert_eq!(state.last_error().unwrap().tier, Tier::Analysis);
        assert_eq!(state.source(), Source::AnalysisFailed);
    }

    #[tokio::test]
    async fn test_analysis_node_failure_is_not_a_kb_answer() {
        let engine = engine(
            Ok(vec![kb_match("alg_001", 0.92)]),
            Fixed::new(Err(ProviderError::RequestFailed("HTTP 503".to_string()))),
            Fixed::new(Ok("unused".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        assert_eq!(state.confidence(), ConfidenceBand::High);
        let state = engine.analyze_with_context(state).await;

        assert_eq!(state.source(), Source::AnalysisFailed);
        assert!(state.source().is_terminal());
        assert_eq!(state.source_tag(), Some(ANALYSIS_FAILED_TAG));
        assert_eq!(state.confidence(), ConfidenceBand::None);
        assert!(state.confidence_score().abs() < f64::EPSILON);
        assert_eq!(state.kb_matches().len(), 1);
        assert!(state.analysis_answer().is_none());
    }

    #[tokio::test]
    async fn test_web_node_keeps_kb_error_on_success() {
        let engine = engine(
            Err(ProviderError::Unavailable("index offline".to_string())),
            Fixed::new(Ok("unused".to_string())),
            Fixed::new(Ok("x = 4".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        let state = engine.web_search(state).await;

        assert_eq!(state.source(), Source::WebSearch);
        assert_eq!(state.final_answer(), Some("x = 4"));
        let error = state.last_error().unwrap();
        assert_eq!(error.tier, Tier::KnowledgeBase);
        assert!(error.message.contains("index offline"));
    }

    #[tokio::test]
    async fn test_analysis_node_without_match_is_noop() {
        let engine = engine(
            Ok(Vec::new()),
            Fixed::new(Ok("answer".to_string())),
            Fixed::new(Ok("answer".to_string())),
        );

        let before = initial();
        let after = engine.analyze_with_context(before.clone()).await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_web_node_content_failure() {
        let engine = engine(
            Ok(Vec::new()),
            Fixed::new(Ok("unused".to_string())),
            Fixed::new(Ok("Request failed due to timeout".to_string())),
        );

        let state = engine.search_knowledge_base(initial()).await;
        let state = engine.web_search(state).await;

        assert!(state.final_answer().is_none());
        assert_eq!(state.web_answer(), Some("Request failed due to timeout"));
        let error = state.last_error().unwrap();
        assert_eq!(error.tier, Tier::WebSearch);
        assert_eq!(error.kind, crate::workflow::ErrorKind::Content);
        assert_eq!(engine.route_after_web_search(&state), WebRoute::NotFound);
    }

    #[tokio::test]
    async fn test_not_found_node() {
        let engine = engine(
            Ok(Vec::new()),
            Fixed::new(Ok("unused".to_string())),
            Fixed::new(Ok(String::new())),
        );

        let state = engine.not_found(initial());
        assert_eq!(state.source(), Source::NotFound);
        assert_eq!(state.source_tag(), Some(NOT_FOUND_TAG));
        assert_eq!(state.final_answer(), Some(NOT_FOUND_MESSAGE));
        assert!(state.confidence_score().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_nodes_are_idempotent() {
        let engine = engine(
            Ok(vec![kb_match("alg_001", 0.92), kb_match("alg_002", 0.61)]),
            Fixed::new(Ok("x=1 (double), x=-2".to_string())),
            Fixed::new(Ok("x = 1".to_string())),
        );

        let input = initial();
        let searched = engine.search_knowledge_base(input.clone()).await;
        assert_eq!(searched, engine.search_knowledge_base(input).await);

        let analyzed = engine.analyze_with_context(searched.clone()).await;
        assert_eq!(analyzed, engine.analyze_with_context(searched.clone()).await);

        let web = engine.web_search(searched.clone()).await;
        assert_eq!(web, engine.web_search(searched.clone()).await);

        let missing = engine.not_found(searched.clone());
        assert_eq!(missing, engine.not_found(searched));
    }

    #[tokio::test]
    async fn test_failing_nodes_are_idempotent() {
        let engine = engine(
            Err(ProviderError::RequestFailed("HTTP 500".to_string())),
            Fixed::new(Err(ProviderError::RequestFailed("HTTP 502".to_string()))),
            Fixed::new(Err(ProviderError::Timeout(Duration::from_secs(1)))),
        );

        let input = initial();
        let searched = engine.search_knowledge_base(input.clone()).await;
        assert_eq!(searched, engine.search_knowledge_base(input).await);

        let web = engine.web_search(searched.clone()).await;
        assert_eq!(web, engine.web_search(searched).await);
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_question() {
        let engine = engine(
            Ok(Vec::new()),
            Fixed::new(Ok("unused".to_string())),
            Fixed::new(Ok("unused".to_string())),
        );

        let result = engine.resolve(&ResolutionRequest::new("")).await;
        assert_eq!(result, Err(ConfigurationError::EmptyQuestion));
    }
}
