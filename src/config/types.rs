//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowSettings;

/// LLM provider kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Perplexity,
}

impl ProviderKind {
    /// Label used in stage names and source tags.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Perplexity => "perplexity",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::Perplexity => "sonar",
        }
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Perplexity => "https://api.perplexity.ai",
        }
    }

    #[must_use]
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Perplexity => "PERPLEXITY_API_KEY",
        }
    }
}

/// Configuration for one LLM-backed provider.
///
/// Unset fields fall back to the provider kind's defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    /// Maximum tokens in response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_max_tokens() -> u32 {
    2048
}

impl AiConfig {
    #[must_use]
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: default_max_tokens(),
            base_url: None,
            api_key_env: None,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    #[must_use]
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

/// How escalation stages are bound to providers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// `[analysis]` answers with context, `[web_search]` answers bare questions.
    #[default]
    Split,
    /// `[web_search]` provider serves both capabilities.
    Unified,
}

/// Workflow tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub top_k: usize,
    pub score_threshold: f64,
    pub escalation_gate: f64,
    pub provider_timeout_secs: u64,
    pub topology: Topology,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let settings = WorkflowSettings::default();
        Self {
            top_k: settings.top_k,
            score_threshold: settings.score_threshold,
            escalation_gate: settings.escalation_gate,
            provider_timeout_secs: settings.provider_timeout.as_secs(),
            topology: Topology::default(),
        }
    }
}

impl WorkflowConfig {
    #[must_use]
    pub fn settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            top_k: self.top_k,
            score_threshold: self.score_threshold,
            escalation_gate: self.escalation_gate,
            provider_timeout: Duration::from_secs(self.provider_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// JSON problem list; the bundled sample problems are used when unset.
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    pub path: PathBuf,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/feedback.json"),
        }
    }
}

/// Additions to the built-in guardrail vocabularies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailsConfig {
    pub extra_keywords: Vec<String>,
    pub extra_prohibited_terms: Vec<String>,
    /// Share of math indicators a question needs to be approved outright.
    pub acceptance_ratio: f64,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            extra_keywords: Vec::new(),
            extra_prohibited_terms: Vec::new(),
            acceptance_ratio: 0.5,
        }
    }
}

/// Top-level resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    pub workflow: WorkflowConfig,
    pub analysis: AiConfig,
    pub web_search: AiConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub feedback: FeedbackConfig,
    pub guardrails: GuardrailsConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            analysis: AiConfig::for_provider(ProviderKind::Gemini),
            web_search: AiConfig::for_provider(ProviderKind::Perplexity),
            knowledge_base: KnowledgeBaseConfig::default(),
            feedback: FeedbackConfig::default(),
            guardrails: GuardrailsConfig::default(),
        }
    }
}
