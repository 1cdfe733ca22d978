//! Embedding generation and persistence
//!
//! Wraps an [`EmbeddingBackend`] with batch helpers, lossless JSON
//! persistence for embedded chunks, and the cosine similarity utility used
//! across the retrieval stack.

mod client;

pub use client::{EmbeddingBackend, GeminiEmbeddings, TaskType};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::chunking::{Chunk, ChunkMetadata};
use crate::errors::{AssistantError, Result};

/// A chunk paired with its embedding vector. Created once at build time and
/// immutable afterwards; re-embedding regenerates the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
    pub embedding_model: String,
}

/// Generates embeddings for chunks and queries via the configured backend.
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
}

impl Embedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Embed a single text with an explicit task type.
    pub async fn embed_text(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        self.backend.embed(text, task).await
    }

    /// Embed a search query.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.backend.embed(query, TaskType::RetrievalQuery).await
    }

    /// Embed a chunk sequence, preserving input order.
    ///
    /// Calls are sequential; a backend failure aborts the batch rather than
    /// leaving zero vectors behind.
    pub async fn embed_chunks(
        &self,
        chunks: &[Chunk],
        show_progress: bool,
    ) -> Result<Vec<EmbeddedChunk>> {
        let bar = if show_progress {
            let bar = ProgressBar::new(chunks.len() as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {pos}/{len}",
                )
                .unwrap()
                .progress_chars("=> "),
            );
            bar.set_message("Embedding chunks");
            Some(bar)
        } else {
            None
        };

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self
                .backend
                .embed(&chunk.text, TaskType::RetrievalDocument)
                .await?;

            embedded.push(EmbeddedChunk {
                chunk_id: chunk.chunk_id.clone(),
                text: chunk.text.clone(),
                embedding,
                metadata: chunk.metadata.clone(),
                embedding_model: self.backend.model_name().to_string(),
            });

            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }

        Ok(embedded)
    }

    /// Probe the backend once to learn the embedding dimension.
    pub async fn embedding_dimension(&self) -> Result<usize> {
        let probe = self
            .backend
            .embed("dimension probe", TaskType::RetrievalDocument)
            .await?;
        Ok(probe.len())
    }
}

/// Persist embedded chunks as a JSON list. Every field round-trips exactly.
pub fn save_embeddings(embedded_chunks: &[EmbeddedChunk], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(embedded_chunks)?;
    fs::write(path, json)?;

    tracing::info!("saved {} embeddings to {}", embedded_chunks.len(), path.display());
    Ok(())
}

/// Load embedded chunks saved by [`save_embeddings`].
///
/// A record missing any field is fatal; there is no partial reconstruction.
pub fn load_embeddings(path: &Path) -> Result<Vec<EmbeddedChunk>> {
    let json = fs::read_to_string(path)?;

    let embedded: Vec<EmbeddedChunk> =
        serde_json::from_str(&json).map_err(|e| AssistantError::MalformedRecord {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    tracing::info!("loaded {} embeddings from {}", embedded.len(), path.display());
    Ok(embedded)
}

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns `0.0` when either norm is zero; that value is defined to avoid a
/// division by zero, not a true cosine.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic in-process backend: fixed vectors for registered texts,
    /// a byte-hash spread for everything else.
    pub(crate) struct StaticBackend {
        vectors: HashMap<String, Vec<f32>>,
        dimension: usize,
    }

    impl StaticBackend {
        pub(crate) fn new(dimension: usize) -> Self {
            Self {
                vectors: HashMap::new(),
                dimension,
            }
        }

        pub(crate) fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
            assert_eq!(vector.len(), self.dimension);
            self.vectors.insert(text.to_string(), vector);
            self
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingBackend for StaticBackend {
        async fn embed(&self, text: &str, _task: TaskType) -> Result<Vec<f32>> {
            if let Some(vector) = self.vectors.get(text) {
                return Ok(vector.clone());
            }
            let mut vector = vec![0.0f32; self.dimension];
            for (i, byte) in text.bytes().enumerate() {
                vector[i % self.dimension] += byte as f32 / 255.0;
            }
            Ok(vector)
        }

        fn model_name(&self) -> &str {
            "static-test-model"
        }
    }
}
