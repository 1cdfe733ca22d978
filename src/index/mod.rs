//! Vector indexing
//!
//! An in-process flat index over L2-normalized embeddings (inner product ≡
//! cosine once normalized) plus a hybrid variant that layers an exact
//! keyword index over rule identifiers on top. Built sequentially at ingest
//! time, read-only while serving queries.

mod hybrid;
mod store;

pub use hybrid::HybridIndex;
pub use store::VectorIndex;

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkMetadata;
use crate::extract::DocumentKind;

/// One ranked hit from a search. Request-scoped; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
    /// 1-based, contiguous within a result sequence.
    pub rank: usize,
}

/// Exact-match conjunction over chunk metadata fields.
///
/// Every populated field must match for a chunk to pass.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub document_kind: Option<DocumentKind>,
    pub filename: Option<String>,
}

impl MetadataFilter {
    pub fn by_kind(kind: DocumentKind) -> Self {
        Self {
            document_kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if let Some(kind) = self.document_kind {
            if metadata.document_kind != kind {
                return false;
            }
        }
        if let Some(filename) = &self.filename {
            if &metadata.filename != filename {
                return false;
            }
        }
        true
    }
}
