//! Math Resolver - tiered, confidence-gated answers to mathematics questions.
//!
//! A question is first matched against a knowledge base of solved problems.
//! A strong match is explained by an analysis provider with the stored
//! solution as context; anything else escalates to web search, and a
//! question nobody can answer ends in an explicit not-found envelope.

pub mod ai;
pub mod app;
pub mod config;
pub mod error;
pub mod feedback;
pub mod guardrails;
pub mod knowledge;
pub mod workflow;
