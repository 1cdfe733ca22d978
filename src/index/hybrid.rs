//! Hybrid semantic + keyword index
//!
//! Wraps [`VectorIndex`] with an exact-match keyword map over rule
//! identifiers. A chunk citing a rule id that appears verbatim in the query
//! surfaces even when its embedding is nowhere near the query vector.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::embedding::EmbeddedChunk;
use crate::errors::Result;
use crate::index::{MetadataFilter, SearchResult, VectorIndex};
use crate::rules::extract_rule_ids;

pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.7;
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.3;

/// Vector index with a secondary keyword index over rule identifiers.
pub struct HybridIndex {
    inner: VectorIndex,
    /// Canonical rule-id string → ids of chunks citing it, in insertion order.
    keyword_index: HashMap<String, Vec<String>>,
    semantic_weight: f32,
    keyword_weight: f32,
}

impl HybridIndex {
    pub fn new(dimension: usize) -> Self {
        Self::with_weights(dimension, DEFAULT_SEMANTIC_WEIGHT, DEFAULT_KEYWORD_WEIGHT)
    }

    pub fn with_weights(dimension: usize, semantic_weight: f32, keyword_weight: f32) -> Self {
        Self {
            inner: VectorIndex::new(dimension),
            keyword_index: HashMap::new(),
            semantic_weight,
            keyword_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    pub fn inner(&self) -> &VectorIndex {
        &self.inner
    }

    /// Add chunks to the vector index and file their rule ids in the
    /// keyword map.
    pub fn add(&mut self, embedded_chunks: Vec<EmbeddedChunk>) -> Result<()> {
        for chunk in &embedded_chunks {
            for rule_id in &chunk.metadata.rule_ids {
                self.keyword_index
                    .entry(rule_id.canonical())
                    .or_default()
                    .push(chunk.chunk_id.clone());
            }
        }
        self.inner.add(embedded_chunks)
    }

    /// Pure semantic search; see [`VectorIndex::search`].
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchResult> {
        self.inner.search(query_embedding, top_k, filter)
    }

    /// Hybrid search blending semantic similarity with exact rule-id hits.
    ///
    /// Semantic candidates contribute `semantic_weight × score`; every chunk
    /// filed under a rule id found in `query_text` gains `keyword_weight`,
    /// entering the candidate set if absent. Final order is a stable
    /// descending sort truncated to `top_k` with contiguous ranks.
    pub fn search_hybrid(
        &self,
        query_embedding: &[f32],
        query_text: &str,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let semantic = self.inner.search(query_embedding, top_k * 2, None);

        let mut combined: Vec<(String, f32)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for result in &semantic {
            positions.insert(result.chunk_id.clone(), combined.len());
            combined.push((
                result.chunk_id.clone(),
                self.semantic_weight * result.score,
            ));
        }

        let mut keyword_hits: HashSet<String> = HashSet::new();
        for rule_id in extract_rule_ids(query_text) {
            if let Some(chunk_ids) = self.keyword_index.get(&rule_id.canonical()) {
                for chunk_id in chunk_ids {
                    keyword_hits.insert(chunk_id.clone());
                }
            }
        }

        // Candidate order is semantic rank first, then keyword-only hits in
        // sorted id order, so tied scores break deterministically.
        let mut keyword_only: Vec<String> = keyword_hits
            .iter()
            .filter(|id| !positions.contains_key(*id))
            .cloned()
            .collect();
        keyword_only.sort();

        for chunk_id in keyword_hits.iter() {
            if let Some(&pos) = positions.get(chunk_id) {
                combined[pos].1 += self.keyword_weight;
            }
        }
        for chunk_id in keyword_only {
            combined.push((chunk_id, self.keyword_weight));
        }

        combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        combined.truncate(top_k);

        combined
            .into_iter()
            .enumerate()
            .filter_map(|(idx, (chunk_id, score))| {
                let chunk = self.inner.get_chunk_by_id(&chunk_id)?;
                Some(SearchResult {
                    chunk_id,
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    score,
                    rank: idx + 1,
                })
            })
            .collect()
    }

    pub fn get_chunk_by_id(&self, chunk_id: &str) -> Option<&EmbeddedChunk> {
        self.inner.get_chunk_by_id(chunk_id)
    }

    /// Number of distinct rule identifiers in the keyword map.
    pub fn keyword_count(&self) -> usize {
        self.keyword_index.len()
    }

    /// Persist the snapshot; the keyword map is rebuilt from chunk metadata
    /// on load.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.inner.save(dir)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let inner = VectorIndex::load(dir)?;

        let mut keyword_index: HashMap<String, Vec<String>> = HashMap::new();
        for chunk in inner.chunks() {
            for rule_id in &chunk.metadata.rule_ids {
                keyword_index
                    .entry(rule_id.canonical())
                    .or_default()
                    .push(chunk.chunk_id.clone());
            }
        }

        Ok(Self {
            inner,
            keyword_index,
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
        })
    }
}
