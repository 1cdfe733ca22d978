//! Flat inner-product vector index
//!
//! Embeddings are L2-normalized on insertion so inner-product scoring equals
//! cosine similarity. Search over-fetches twice the requested count before
//! metadata filtering so a selective filter does not starve the result set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::embedding::EmbeddedChunk;
use crate::errors::{AssistantError, Result};
use crate::extract::DocumentKind;
use crate::index::{MetadataFilter, SearchResult};

const SNAPSHOT_INDEX_FILE: &str = "index.bin";
const SNAPSHOT_CHUNKS_FILE: &str = "chunks.json";

/// Binary snapshot payload for the nearest-neighbor structure.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    chunk_count: usize,
    created_at: DateTime<Utc>,
}

/// In-memory vector store over embedded chunks.
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<EmbeddedChunk>,
    id_to_position: HashMap<String, usize>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            chunks: Vec::new(),
            id_to_position: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Append embedded chunks to the index.
    ///
    /// Vectors are normalized before insertion; the stored chunk records keep
    /// their original embeddings.
    pub fn add(&mut self, embedded_chunks: Vec<EmbeddedChunk>) -> Result<()> {
        for chunk in embedded_chunks {
            if chunk.embedding.len() != self.dimension {
                return Err(AssistantError::DimensionMismatch {
                    expected: self.dimension,
                    actual: chunk.embedding.len(),
                });
            }

            self.vectors.push(normalize(&chunk.embedding));
            self.id_to_position
                .insert(chunk.chunk_id.clone(), self.chunks.len());
            self.chunks.push(chunk);
        }

        tracing::debug!("index now holds {} chunks", self.chunks.len());
        Ok(())
    }

    /// Nearest-neighbor search, best score first.
    ///
    /// Twice `top_k` candidates are scored out of the flat structure before
    /// the metadata filter runs; collection stops at `top_k` passing results
    /// or when candidates are exhausted. Ranks are 1-based and contiguous.
    /// An empty index returns an empty sequence, not an error.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchResult> {
        if self.chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query = normalize(query_embedding);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, vector)| (pos, inner_product(&query, vector)))
            .collect();

        // Stable sort keeps insertion order for tied scores, which makes
        // repeated identical queries return identical rankings.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate((top_k * 2).min(self.chunks.len()));

        let mut results = Vec::new();
        for (pos, score) in scored {
            let chunk = &self.chunks[pos];

            if let Some(filter) = filter {
                if !filter.matches(&chunk.metadata) {
                    continue;
                }
            }

            results.push(SearchResult {
                chunk_id: chunk.chunk_id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                score,
                rank: results.len() + 1,
            });

            if results.len() >= top_k {
                break;
            }
        }

        results
    }

    pub fn get_chunk_by_id(&self, chunk_id: &str) -> Option<&EmbeddedChunk> {
        self.id_to_position
            .get(chunk_id)
            .map(|&pos| &self.chunks[pos])
    }

    pub fn chunks(&self) -> &[EmbeddedChunk] {
        &self.chunks
    }

    /// Chunk counts per document kind.
    pub fn kind_counts(&self) -> HashMap<DocumentKind, usize> {
        let mut counts = HashMap::new();
        for chunk in &self.chunks {
            *counts.entry(chunk.metadata.document_kind).or_insert(0) += 1;
        }
        counts
    }

    /// Write the snapshot: a binary file for the normalized vectors and a
    /// JSON file for the chunk records.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let snapshot = IndexSnapshot {
            dimension: self.dimension,
            vectors: self.vectors.clone(),
            chunk_count: self.chunks.len(),
            created_at: Utc::now(),
        };

        let encoded = bincode::serialize(&snapshot).map_err(|e| AssistantError::Snapshot {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(dir.join(SNAPSHOT_INDEX_FILE), encoded)?;

        let chunks_json = serde_json::to_string(&self.chunks)?;
        fs::write(dir.join(SNAPSHOT_CHUNKS_FILE), chunks_json)?;

        tracing::info!("saved index snapshot ({} chunks) to {}", self.chunks.len(), dir.display());
        Ok(())
    }

    /// Restore an index whose search behavior is identical to the one saved.
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(SNAPSHOT_INDEX_FILE);
        let chunks_path = dir.join(SNAPSHOT_CHUNKS_FILE);

        let encoded = fs::read(&index_path)?;
        let snapshot: IndexSnapshot =
            bincode::deserialize(&encoded).map_err(|e| AssistantError::Snapshot {
                path: index_path.clone(),
                message: e.to_string(),
            })?;

        let chunks_json = fs::read_to_string(&chunks_path)?;
        let chunks: Vec<EmbeddedChunk> =
            serde_json::from_str(&chunks_json).map_err(|e| AssistantError::MalformedRecord {
                path: chunks_path,
                message: e.to_string(),
            })?;

        if snapshot.chunk_count != chunks.len() || snapshot.vectors.len() != chunks.len() {
            return Err(AssistantError::Snapshot {
                path: index_path,
                message: format!(
                    "snapshot lists {} vectors but {} chunk records",
                    snapshot.vectors.len(),
                    chunks.len()
                ),
            });
        }

        let id_to_position = chunks
            .iter()
            .enumerate()
            .map(|(pos, chunk)| (chunk.chunk_id.clone(), pos))
            .collect();

        Ok(Self {
            dimension: snapshot.dimension,
            vectors: snapshot.vectors,
            chunks,
            id_to_position,
        })
    }
}

/// L2-normalize a vector; a zero vector is returned unchanged.
fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkMetadata;

    fn embedded(id: &str, kind: DocumentKind, embedding: Vec<f32>) -> EmbeddedChunk {
        embedded_with_text(id, kind, &format!("text of {id}"), embedding)
    }

    fn embedded_with_text(
        id: &str,
        kind: DocumentKind,
        text: &str,
        embedding: Vec<f32>,
    ) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: ChunkMetadata {
                document_kind: kind,
                filename: format!("{}.pdf", kind.slug()),
                page_range: (1, 5),
                rule_ids: crate::rules::extract_rule_ids(text),
                chunk_number: 0,
            },
            embedding_model: "static-test-model".to_string(),
        }
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = VectorIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5, None).is_empty());
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = VectorIndex::new(3);
        index
            .add(vec![
                embedded("a", DocumentKind::Rulebook, vec![1.0, 0.0, 0.0]),
                embedded("b", DocumentKind::Rulebook, vec![0.0, 1.0, 0.0]),
                embedded("c", DocumentKind::Rulebook, vec![0.9, 0.1, 0.0]),
            ])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3, None);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk_id, "a");
        assert_eq!(results[1].chunk_id, "c");
        assert_eq!(results[2].chunk_id, "b");
        assert_eq!(
            results.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_unnormalized_input_scores_like_cosine() {
        let mut index = VectorIndex::new(2);
        index
            .add(vec![embedded(
                "a",
                DocumentKind::Handbook,
                vec![10.0, 0.0],
            )])
            .unwrap();

        let results = index.search(&[3.0, 0.0], 1, None);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new(3);
        let result = index.add(vec![embedded("a", DocumentKind::Rulebook, vec![1.0, 0.0])]);
        assert!(matches!(
            result,
            Err(AssistantError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_metadata_filter_limits_results() {
        let mut index = VectorIndex::new(2);
        let mut batch = Vec::new();
        for i in 0..10 {
            let kind = if i < 2 {
                DocumentKind::Handbook
            } else {
                DocumentKind::Rulebook
            };
            batch.push(embedded(
                &format!("c{i}"),
                kind,
                vec![1.0, i as f32 * 0.01],
            ));
        }
        index.add(batch).unwrap();

        let filter = MetadataFilter::by_kind(DocumentKind::Handbook);
        let results = index.search(&[1.0, 0.0], 5, Some(&filter));

        assert!(results.len() <= 2);
        assert!(!results.is_empty());
        for result in &results {
            assert_eq!(result.metadata.document_kind, DocumentKind::Handbook);
        }
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=results.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_repeated_queries_identical() {
        let mut index = VectorIndex::new(3);
        index
            .add(vec![
                embedded("a", DocumentKind::Rulebook, vec![0.5, 0.5, 0.0]),
                embedded("b", DocumentKind::Rulebook, vec![0.5, 0.5, 0.0]),
                embedded("c", DocumentKind::Rulebook, vec![0.1, 0.9, 0.0]),
            ])
            .unwrap();

        let first = index.search(&[0.4, 0.6, 0.0], 3, None);
        let second = index.search(&[0.4, 0.6, 0.0], 3, None);

        let ids = |rs: &[SearchResult]| rs.iter().map(|r| r.chunk_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_save_load_round_trip_preserves_search() {
        let mut index = VectorIndex::new(3);
        index
            .add(vec![
                embedded("a", DocumentKind::Handbook, vec![1.0, 0.2, 0.0]),
                embedded("b", DocumentKind::Rulebook, vec![0.0, 1.0, 0.3]),
                embedded("c", DocumentKind::Rulebook, vec![0.7, 0.7, 0.0]),
            ])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        index.save(dir.path()).unwrap();
        let restored = VectorIndex::load(dir.path()).unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(restored.dimension(), 3);

        let query = [0.6, 0.4, 0.1];
        let before = index.search(&query, 3, None);
        let after = restored.search(&query, 3, None);

        assert_eq!(before.len(), after.len());
        for (x, y) in before.iter().zip(after.iter()) {
            assert_eq!(x.chunk_id, y.chunk_id);
            assert_eq!(x.rank, y.rank);
            assert!((x.score - y.score).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_rejects_inconsistent_snapshot() {
        let mut index = VectorIndex::new(2);
        index
            .add(vec![embedded("a", DocumentKind::Rulebook, vec![1.0, 0.0])])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        index.save(dir.path()).unwrap();

        // Truncate the chunk list while leaving the binary snapshot alone.
        std::fs::write(dir.path().join("chunks.json"), "[]").unwrap();

        let result = VectorIndex::load(dir.path());
        assert!(matches!(result, Err(AssistantError::Snapshot { .. })));
    }

    #[test]
    fn test_kind_counts() {
        let mut index = VectorIndex::new(2);
        index
            .add(vec![
                embedded("a", DocumentKind::Handbook, vec![1.0, 0.0]),
                embedded("b", DocumentKind::Rulebook, vec![0.0, 1.0]),
                embedded("c", DocumentKind::Rulebook, vec![1.0, 1.0]),
            ])
            .unwrap();

        let counts = index.kind_counts();
        assert_eq!(counts[&DocumentKind::Handbook], 1);
        assert_eq!(counts[&DocumentKind::Rulebook], 2);
    }
}
