//! Scrutineer - Rulebook Retrieval Assistant
//!
//! Answers domain questions about a competition rulebook by combining
//! retrieval over chunked document text with an external reasoning model
//! and deterministic scoring formulas.
//!
//! # Architecture
//!
//! - Build time: extract -> chunk -> embed -> index, persisted as JSON
//!   artifacts plus a binary index snapshot
//! - Query time: embed query -> hybrid (semantic + rule-id keyword) search
//!   -> handbook priority re-ranking -> formatted context

pub mod errors;
pub mod rules;
pub mod extract;
pub mod chunking;
pub mod embedding;
pub mod index;
pub mod retrieval;
pub mod formulas;
pub mod pipeline;
pub mod config;

// Re-export commonly used types
pub use errors::{AssistantError, Result};
pub use retrieval::{RetrievalResult, Retriever};
