//! Error types for the scrutineer retrieval stack
//!
//! Build-time failures (missing sources, malformed records) are fatal and
//! halt the pipeline; query-time failures are reported per question by the
//! interactive host and never crash the loop.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the retrieval and ingest subsystems
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Source document does not exist; raised before any processing begins
    #[error("Source document not found: {0}")]
    MissingSource(PathBuf),

    /// Both extraction methods failed for a document
    #[error("Failed to extract text from '{path}': {message}")]
    Extraction { path: PathBuf, message: String },

    /// Embedding service rejected or failed a request
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// HTTP transport errors from the embedding client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A persisted record is missing fields or otherwise unreadable
    #[error("Malformed record in '{path}': {message}")]
    MalformedRecord { path: PathBuf, message: String },

    /// Index snapshot could not be written or restored
    #[error("Index snapshot error at '{path}': {message}")]
    Snapshot { path: PathBuf, message: String },

    /// Vector dimension does not match the index
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, AssistantError>;
