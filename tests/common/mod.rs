//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use math_resolver::error::ProviderError;
use math_resolver::knowledge::{KbMatch, Problem};
use math_resolver::workflow::{
    AnalysisProvider, KnowledgeBaseProvider, SearchParams, WebSearchProvider,
};

pub fn problem(id: &str, question: &str, final_answer: &str) -> Problem {
    Problem {
        problem_id: id.to_string(),
        question: question.to_string(),
        solution_steps: vec!["Work it out".to_string()],
        final_answer: final_answer.to_string(),
        difficulty: "JEE_Main".to_string(),
        tags: vec!["test".to_string()],
        topic: "Algebra".to_string(),
    }
}

/// Knowledge base that returns a fixed result for every query.
pub struct StaticKb {
    result: Result<Vec<KbMatch>, ProviderError>,
    pub calls: AtomicUsize,
}

impl StaticKb {
    pub fn with_matches(matches: Vec<KbMatch>) -> Self {
        Self {
            result: Ok(matches),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::with_matches(Vec::new())
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KnowledgeBaseProvider for StaticKb {
    async fn search(
        &self,
        _query: &str,
        _params: &SearchParams,
    ) -> Result<Vec<KbMatch>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Analysis provider with a scripted reply that records the context it saw.
pub struct ScriptedAnalysis {
    reply: Result<String, ProviderError>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub contexts: Mutex<Vec<String>>,
}

impl ScriptedAnalysis {
    pub fn answering(answer: &str) -> Self {
        Self {
            reply: Ok(answer.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            ..Self::answering("")
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedAnalysis {
    async fn analyze(&self, _question: &str, context: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts
            .lock()
            .unwrap()
            .push(context.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone()
    }
}

/// Web-search provider with a scripted reply.
pub struct ScriptedWeb {
    reply: Result<String, ProviderError>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedWeb {
    pub fn answering(answer: &str) -> Self {
        Self {
            reply: Ok(answer.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            ..Self::answering("")
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for ScriptedWeb {
    async fn search(&self, _question: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone()
    }
}

/// One provider serving both capabilities, answering differently per tier.
pub struct UnifiedFake {
    pub analysis_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl UnifiedFake {
    pub fn new() -> Self {
        Self {
            analysis_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AnalysisProvider for UnifiedFake {
    async fn analyze(&self, _question: &str, _context: &str) -> Result<String, ProviderError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        Ok("Answer grounded in the stored solution".to_string())
    }
}

#[async_trait]
impl WebSearchProvider for UnifiedFake {
    async fn search(&self, _question: &str) -> Result<String, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok("Answer from the web: π²/6".to_string())
    }
}
