//! Curated problem knowledge base.
//!
//! Provides the record types shared with the workflow engine, an in-process
//! index ranked by lexical similarity, and text renderings of its content.

mod catalog;
mod index;
mod types;

pub use catalog::*;
pub use index::*;
pub use types::*;
