//! Wiring from configuration to a running resolver.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::ai::LlmProvider;
use crate::config::{ConfigError, ResolverConfig, Topology};
use crate::error::ConfigurationError;
use crate::feedback::{
    FeedbackEntry, FeedbackError, FeedbackStatistics, FeedbackStore, FeedbackSubmission,
    NegativeSummary, Rating,
};
use crate::guardrails::{Gateway, GuardVerdict, GuardrailError};
use crate::knowledge::{
    format_problem_details, format_search_results, format_topics, InMemoryKnowledgeBase,
    SeedError,
};
use crate::workflow::{
    EscalationStage, KnowledgeBaseProvider, ResolutionEnvelope, ResolutionRequest, SearchParams,
    WorkflowEngine,
};

/// Rates the previous answer: `:rate <thumbs_up|thumbs_down> [comment]`.
pub const RATE_COMMAND: &str = ":rate";
/// Lists knowledge-base problems similar to a query: `:search <query>`.
pub const SEARCH_COMMAND: &str = ":search";
/// Shows one knowledge-base problem in full: `:problem <id>`.
pub const PROBLEM_COMMAND: &str = ":problem";
/// Lists knowledge-base topics.
pub const TOPICS_COMMAND: &str = ":topics";
/// Shows feedback statistics and the negative-feedback summary.
pub const FEEDBACK_STATS_COMMAND: &str = ":feedback-stats";

/// Errors that stop the resolver from starting or serving.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to load knowledge base: {0}")]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Engine(#[from] ConfigurationError),
    #[error("Failed to build guardrails: {0}")]
    Guardrail(#[from] GuardrailError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Malformed command lines.
#[derive(Error, Debug)]
pub enum InputError {
    #[error(transparent)]
    Rating(#[from] FeedbackError),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Load the knowledge base from the configured seed file, or the bundled samples.
///
/// # Errors
///
/// Returns `SeedError` if the seed cannot be read or parsed.
pub async fn build_knowledge_base(
    config: &ResolverConfig,
) -> Result<InMemoryKnowledgeBase, SeedError> {
    match &config.knowledge_base.seed_path {
        Some(path) => InMemoryKnowledgeBase::load(path).await,
        None => {
            let kb = InMemoryKnowledgeBase::with_sample_problems()?;
            tracing::info!(count = kb.count(), "Loaded bundled sample problems");
            Ok(kb)
        }
    }
}

/// Bind providers to escalation stages for a topology.
///
/// `split` uses `analysis` for the context tier and `web` for the bare tier;
/// `unified` lets `web` serve both and ignores `analysis`.
#[must_use]
pub fn build_stages(
    topology: Topology,
    analysis: Option<LlmProvider>,
    web: LlmProvider,
) -> Vec<EscalationStage> {
    let web_label = web.kind().label();
    match (topology, analysis) {
        (Topology::Split, Some(analysis)) => vec![
            EscalationStage::analysis(analysis.kind().label(), Arc::new(analysis)),
            EscalationStage::web_search(web_label, Arc::new(web)),
        ],
        (Topology::Split, None) => vec![EscalationStage::web_search(web_label, Arc::new(web))],
        (Topology::Unified, _) => vec![EscalationStage::unified(web_label, Arc::new(web))],
    }
}

/// Build the engine described by `config` around `knowledge_base`.
///
/// # Errors
///
/// Returns `ConfigurationError::Provider` if a provider cannot be constructed
/// (for example a missing API key) and other variants for invalid settings.
pub fn build_engine(
    config: &ResolverConfig,
    knowledge_base: Arc<dyn KnowledgeBaseProvider>,
) -> Result<WorkflowEngine, ConfigurationError> {
    let topology = config.workflow.topology;

    let provider = |ai: &crate::config::AiConfig| {
        LlmProvider::from_config(ai).map_err(|source| ConfigurationError::Provider {
            stage: ai.provider.label().to_string(),
            source,
        })
    };

    let analysis = match topology {
        Topology::Split => Some(provider(&config.analysis)?),
        Topology::Unified => None,
    };
    let web = provider(&config.web_search)?;

    let stages = build_stages(topology, analysis, web);
    tracing::info!(
        ?topology,
        stages = ?stages.iter().map(EscalationStage::label).collect::<Vec<_>>(),
        "Built escalation chain"
    );

    stages
        .into_iter()
        .fold(WorkflowEngine::builder(knowledge_base), |builder, stage| {
            builder.stage(stage)
        })
        .settings(config.workflow.settings())
        .build()
}

/// One line of resolver input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Blank,
    Question(String),
    Rate {
        rating: Rating,
        comment: Option<String>,
    },
    Search(String),
    Problem(String),
    Topics,
    FeedbackStats,
}

impl InputLine {
    /// Parse a raw line into a command or a question.
    ///
    /// Lines whose first word is not a known command are questions.
    ///
    /// # Errors
    ///
    /// Returns `InputError` for a malformed command.
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Blank);
        }

        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            RATE_COMMAND => {
                let (rating, comment) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let comment = comment.trim();
                Ok(Self::Rate {
                    rating: rating.parse()?,
                    comment: (!comment.is_empty()).then(|| comment.to_string()),
                })
            }
            SEARCH_COMMAND if rest.is_empty() => Err(InputError::Usage(":search <query>")),
            SEARCH_COMMAND => Ok(Self::Search(rest.to_string())),
            PROBLEM_COMMAND if rest.is_empty() => Err(InputError::Usage(":problem <id>")),
            PROBLEM_COMMAND => Ok(Self::Problem(rest.to_string())),
            TOPICS_COMMAND => Ok(Self::Topics),
            FEEDBACK_STATS_COMMAND => Ok(Self::FeedbackStats),
            _ => Ok(Self::Question(line.to_string())),
        }
    }
}

/// One line of resolver output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutputLine {
    Resolved(ResolutionEnvelope),
    Rejected {
        question: String,
        guardrail: GuardVerdict,
    },
    FeedbackRecorded {
        entry: FeedbackEntry,
    },
    /// Human-readable knowledge-base listing.
    Listing {
        text: String,
    },
    FeedbackStats {
        statistics: FeedbackStatistics,
        negative: NegativeSummary,
    },
    Error {
        message: String,
    },
}

/// The resolver with its guardrails and feedback log.
pub struct App {
    engine: WorkflowEngine,
    gateway: Gateway,
    feedback: Mutex<FeedbackStore>,
    catalog: Option<Arc<InMemoryKnowledgeBase>>,
}

impl App {
    #[must_use]
    pub fn new(engine: WorkflowEngine, gateway: Gateway, feedback: FeedbackStore) -> Self {
        Self {
            engine,
            gateway,
            feedback: Mutex::new(feedback),
            catalog: None,
        }
    }

    /// Serve the catalog commands from `knowledge_base`.
    #[must_use]
    pub fn with_catalog(mut self, knowledge_base: Arc<InMemoryKnowledgeBase>) -> Self {
        self.catalog = Some(knowledge_base);
        self
    }

    /// Build everything from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the knowledge base, providers, or guardrails
    /// cannot be built.
    pub async fn from_config(config: &ResolverConfig) -> Result<Self, AppError> {
        let knowledge_base = Arc::new(build_knowledge_base(config).await?);
        let engine = build_engine(config, knowledge_base.clone())?;
        let gateway = Gateway::from_config(&config.guardrails)?;
        let feedback = FeedbackStore::open(config.feedback.path.clone()).await;
        Ok(Self::new(engine, gateway, feedback).with_catalog(knowledge_base))
    }

    #[must_use]
    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Screen, resolve, and screen again.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` only for a blank question.
    pub async fn answer(&self, question: &str) -> Result<OutputLine, ConfigurationError> {
        let verdict = self.gateway.screen_question(question);
        if verdict.is_rejected() {
            tracing::info!(message = %verdict.message, "Question rejected by guardrails");
            return Ok(OutputLine::Rejected {
                question: question.to_string(),
                guardrail: verdict,
            });
        }
        if !verdict.is_approved() {
            tracing::warn!(message = %verdict.message, "Question accepted with warning");
        }

        let envelope = self
            .engine
            .resolve(&ResolutionRequest::new(question))
            .await?;
        let (envelope, output_verdict) = self.gateway.screen_envelope(envelope);
        if !output_verdict.is_approved() {
            tracing::warn!(message = %output_verdict.message, "Answer flagged by guardrails");
        }
        Ok(OutputLine::Resolved(envelope))
    }

    /// Record a rating for an answer.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` if the feedback log cannot be written.
    pub async fn rate(
        &self,
        question: &str,
        envelope: &ResolutionEnvelope,
        rating: Rating,
        comment: Option<String>,
    ) -> Result<FeedbackEntry, FeedbackError> {
        let mut submission = FeedbackSubmission::from_envelope(question, envelope, rating);
        submission.comment = comment;
        self.feedback.lock().await.submit(submission).await
    }

    fn catalog(&self) -> Result<&InMemoryKnowledgeBase, OutputLine> {
        self.catalog.as_deref().ok_or_else(|| OutputLine::Error {
            message: "Knowledge base catalog is not available".to_string(),
        })
    }

    /// List knowledge-base problems similar to `query`, using the engine's
    /// top-k and score threshold.
    #[must_use]
    pub fn search_catalog(&self, query: &str) -> OutputLine {
        let catalog = match self.catalog() {
            Ok(catalog) => catalog,
            Err(line) => return line,
        };
        let settings = self.engine.settings();
        let params = SearchParams::new(settings.top_k, settings.score_threshold).clamped();
        let matches = catalog.rank(query, &params);
        OutputLine::Listing {
            text: format_search_results(query, params.score_threshold, &matches),
        }
    }

    /// Show one problem with its worked solution.
    #[must_use]
    pub fn problem_details(&self, problem_id: &str) -> OutputLine {
        let catalog = match self.catalog() {
            Ok(catalog) => catalog,
            Err(line) => return line,
        };
        match catalog.get(problem_id) {
            Some(problem) => OutputLine::Listing {
                text: format_problem_details(&problem),
            },
            None => OutputLine::Error {
                message: format!(
                    "Problem '{problem_id}' not found. Available problems: {}",
                    catalog.problem_ids().join(", ")
                ),
            },
        }
    }

    /// List topics with counts and example ids.
    #[must_use]
    pub fn topics(&self) -> OutputLine {
        match self.catalog() {
            Ok(catalog) => OutputLine::Listing {
                text: format_topics(&catalog.topics()),
            },
            Err(line) => line,
        }
    }

    /// Summarise the feedback log.
    pub async fn feedback_stats(&self) -> OutputLine {
        let store = self.feedback.lock().await;
        OutputLine::FeedbackStats {
            statistics: store.statistics(),
            negative: store.negative_summary(),
        }
    }
}
