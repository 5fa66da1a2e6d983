//! Tiered resolution workflow: knowledge base, analysis, web search, not found.

mod confidence;
mod context;
mod engine;
mod provider;
mod stage;
mod state;

pub use confidence::*;
pub use context::*;
pub use engine::*;
pub use provider::*;
pub use stage::*;
pub use state::*;
