//! Human-readable listings of knowledge-base content.

use std::fmt::Write;

use crate::workflow::band_for;

use super::types::{KbMatch, Problem, TopicSummary};

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Render ranked search results with their confidence bands.
#[must_use]
pub fn format_search_results(query: &str, score_threshold: f64, matches: &[KbMatch]) -> String {
    if matches.is_empty() {
        return format!("No problems found matching '{query}' with score >= {score_threshold}");
    }

    let mut out = String::new();
    let _ = writeln!(out, "Found {} matching problem(s):", matches.len());

    for (i, m) in matches.iter().enumerate() {
        let p = &m.problem;
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out, "Result #{}: {}", i + 1, p.problem_id);
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(
            out,
            "Similarity Score: {:.4} ({})",
            m.score,
            band_for(m.score).to_string().to_uppercase()
        );
        let _ = writeln!(out, "Topic: {}", p.topic);
        let _ = writeln!(out, "Difficulty: {}", p.difficulty);
        let _ = writeln!(out, "Question: {}", p.question);
        let _ = writeln!(out, "Final Answer: {}", p.final_answer);
        let _ = writeln!(out, "Tags: {}", p.tags.join(", "));
    }

    out
}

/// Render one problem with its full worked solution.
#[must_use]
pub fn format_problem_details(problem: &Problem) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "PROBLEM: {}", problem.problem_id);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Topic: {}", problem.topic);
    let _ = writeln!(out, "Difficulty: {}", problem.difficulty);
    let _ = writeln!(out, "Tags: {}", problem.tags.join(", "));
    let _ = writeln!(out);
    let _ = writeln!(out, "Question:");
    let _ = writeln!(out, "{}", problem.question);

    if !problem.solution_steps.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Step-by-step solution:");
        for (i, step) in problem.solution_steps.iter().enumerate() {
            let _ = writeln!(out, "  {}. {step}", i + 1);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Final Answer:");
    let _ = write!(out, "  {}", problem.final_answer);
    out
}

/// Render the topic overview.
#[must_use]
pub fn format_topics(topics: &[TopicSummary]) -> String {
    if topics.is_empty() {
        return "No problems found in knowledge base".to_string();
    }

    let total: usize = topics.iter().map(|t| t.count).sum();
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "KNOWLEDGE BASE TOPICS");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Total Problems: {total}");

    for topic in topics {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", topic.topic);
        let _ = writeln!(out, "   Problems: {}", topic.count);
        let _ = writeln!(out, "   Examples: {}", topic.examples.join(", "));
    }

    out
}
