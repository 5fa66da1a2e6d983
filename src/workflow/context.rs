//! Serialization of a knowledge-base match into analysis context.

use std::fmt::Write;

use crate::knowledge::KbMatch;

/// Render a similarity score as a percentage with one decimal.
#[must_use]
pub fn format_similarity(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

/// Build the context block handed to the analysis provider.
#[must_use]
pub fn build_context(best: &KbMatch) -> String {
    let problem = &best.problem;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "KNOWLEDGE BASE MATCH (similarity {}):",
        format_similarity(best.score)
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Problem ID: {}", problem.problem_id);
    let _ = writeln!(out, "Question: {}", problem.question);
    let _ = writeln!(out, "Topic: {}", problem.topic);
    let _ = writeln!(out, "Difficulty: {}", problem.difficulty);
    let _ = writeln!(out);
    let _ = writeln!(out, "Solution steps:");
    for (i, step) in problem.solution_steps.iter().enumerate() {
        let _ = writeln!(out, "{}. {step}", i + 1);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Final Answer: {}", problem.final_answer);
    let _ = writeln!(out);
    let _ = write!(out, "Tags: {}", problem.tags.join(", "));

    out
}
