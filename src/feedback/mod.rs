//! User feedback on resolved answers.
//!
//! Feedback is recorded and summarised for humans; nothing here feeds back
//! into retrieval or prompting.

mod store;
mod types;

use std::io;

use thiserror::Error;

pub use store::FeedbackStore;
pub use types::*;

/// Errors from feedback operations.
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Failed to write feedback file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize feedback: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid rating: {0}. Must be 'thumbs_up' or 'thumbs_down'")]
    InvalidRating(String),
}
