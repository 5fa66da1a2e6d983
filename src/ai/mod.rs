//! LLM providers backing the escalation stages.

mod client;
mod prompts;

pub use client::*;
pub use prompts::{
    format_analysis_prompt, format_web_search_prompt, ANALYSIS_SYSTEM_PROMPT,
    WEB_SEARCH_SYSTEM_PROMPT,
};
