//! Retrieval orchestration
//!
//! Embeds a query, runs hybrid or plain search against the index, and
//! applies the domain re-ranking policy: handbook content outranks the
//! technical rulebook at equal or near-equal similarity.

use serde::Serialize;

use crate::embedding::Embedder;
use crate::errors::Result;
use crate::extract::DocumentKind;
use crate::index::{HybridIndex, MetadataFilter, SearchResult};
use crate::rules::RuleId;

/// Score multiplier applied to authoritative handbook chunks.
pub const HANDBOOK_BOOST: f32 = 1.5;

const DEFAULT_TOP_K: usize = 5;
const RULE_LOOKUP_TOP_K: usize = 10;

/// Result of one retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<SearchResult>,
    pub query: String,
    pub query_embedding: Vec<f32>,
    pub retrieval_method: String,
    pub total_found: usize,
}

/// Summary of the retriever and the index behind it.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverStatistics {
    pub total_chunks: usize,
    pub dimension: usize,
    pub keyword_entries: usize,
    pub top_k_default: usize,
    pub embedding_model: String,
}

/// Main retrieval orchestrator. Owns the index, which stays read-only for
/// the retriever's lifetime.
pub struct Retriever {
    index: HybridIndex,
    embedder: Embedder,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: HybridIndex, embedder: Embedder) -> Self {
        Self {
            index,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Retrieve relevant chunks for a query.
    ///
    /// Embedding failures propagate; an empty index yields an empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
        kind_filter: Option<DocumentKind>,
        hybrid: bool,
    ) -> Result<RetrievalResult> {
        let top_k = top_k.unwrap_or(self.top_k);
        let query_embedding = self.embedder.embed_query(query).await?;

        let (chunks, method) = if hybrid {
            (
                self.index.search_hybrid(&query_embedding, query, top_k),
                "hybrid",
            )
        } else {
            let filter = kind_filter.map(MetadataFilter::by_kind);
            (
                self.index.search(&query_embedding, top_k, filter.as_ref()),
                "semantic",
            )
        };

        Ok(RetrievalResult {
            total_found: chunks.len(),
            chunks,
            query: query.to_string(),
            query_embedding,
            retrieval_method: method.to_string(),
        })
    }

    /// Retrieve with the handbook priority boost applied.
    ///
    /// Fetches twice `top_k` hybrid results, boosts handbook scores by
    /// [`HANDBOOK_BOOST`], re-sorts, truncates, and reassigns ranks.
    pub async fn retrieve_with_priority_boost(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult> {
        let top_k = top_k.unwrap_or(self.top_k);

        let initial = self.retrieve(query, Some(top_k * 2), None, true).await?;

        let boosted = apply_priority_boost(&initial.chunks, HANDBOOK_BOOST);
        let chunks = rerank(boosted, top_k);

        Ok(RetrievalResult {
            total_found: chunks.len(),
            chunks,
            query: initial.query,
            query_embedding: initial.query_embedding,
            retrieval_method: "hybrid_with_handbook_boost".to_string(),
        })
    }

    /// Retrieve chunks that genuinely cite a rule identifier.
    ///
    /// The identifier doubles as the query; hybrid search surfaces exact
    /// keyword matches, and semantic neighbors that do not actually contain
    /// the identifier are filtered out afterwards.
    pub async fn retrieve_by_rule_id(&self, rule_id: &RuleId) -> Result<Vec<SearchResult>> {
        let query = format!("Rule {}", rule_id.canonical());
        let result = self
            .retrieve(&query, Some(RULE_LOOKUP_TOP_K), None, true)
            .await?;

        let wanted = rule_id.compact();
        let matching = result
            .chunks
            .into_iter()
            .filter(|chunk| {
                chunk
                    .metadata
                    .rule_ids
                    .iter()
                    .any(|stored| stored.compact().contains(&wanted))
            })
            .collect();

        Ok(matching)
    }

    /// Format retrieved chunks as a context block for the reasoning model.
    pub fn format_context_for_llm(&self, result: &RetrievalResult) -> String {
        format_context(result)
    }

    pub fn statistics(&self) -> RetrieverStatistics {
        RetrieverStatistics {
            total_chunks: self.index.len(),
            dimension: self.index.dimension(),
            keyword_entries: self.index.keyword_count(),
            top_k_default: self.top_k,
            embedding_model: self.embedder.model_name().to_string(),
        }
    }

    pub fn index(&self) -> &HybridIndex {
        &self.index
    }
}

/// Apply the handbook boost to a result sequence.
///
/// Pure: returns a new, stably re-sorted vector without truncation, leaving
/// the input untouched. Ties after boosting keep their incoming order.
pub fn apply_priority_boost(results: &[SearchResult], boost_factor: f32) -> Vec<SearchResult> {
    let mut boosted: Vec<SearchResult> = results
        .iter()
        .map(|result| {
            let mut out = result.clone();
            if out.metadata.document_kind == DocumentKind::Handbook {
                out.score *= boost_factor;
            }
            out
        })
        .collect();

    boosted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    boosted
}

/// Truncate to `top_k` and reassign contiguous 1-based ranks.
fn rerank(mut results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    results.truncate(top_k);
    for (idx, result) in results.iter_mut().enumerate() {
        result.rank = idx + 1;
    }
    results
}

/// Render a retrieval result as a human-readable context block.
fn format_context(result: &RetrievalResult) -> String {
    if result.chunks.is_empty() {
        return "No relevant context found.".to_string();
    }

    let mut parts = vec!["**Retrieved Rule Sections:**\n".to_string()];

    for chunk in &result.chunks {
        let (start, end) = chunk.metadata.page_range;
        parts.push(format!(
            "\n--- {} (Pages {start}-{end}) [Relevance: {:.3}] ---",
            chunk.metadata.document_kind, chunk.score
        ));
        parts.push(chunk.text.clone());
        parts.push(String::new());
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkMetadata;
    use crate::embedding::testing::StaticBackend;
    use crate::embedding::EmbeddedChunk;
    use crate::rules::extract_rule_ids;
    use std::sync::Arc;

    fn embedded(
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
                rule_ids: extract_rule_ids(text),
                chunk_number: 0,
            },
            embedding_model: "static-test-model".to_string(),
        }
    }

    fn search_result(id: &str, kind: DocumentKind, score: f32, rank: usize) -> SearchResult {
        SearchResult {
            chunk_id: id.to_string(),
            text: format!("text of {id}"),
            metadata: ChunkMetadata {
                document_kind: kind,
                filename: format!("{}.pdf", kind.slug()),
                page_range: (1, 5),
                rule_ids: Vec::new(),
                chunk_number: 0,
            },
            score,
            rank,
        }
    }

    fn retriever_with(
        chunks: Vec<EmbeddedChunk>,
        backend: StaticBackend,
        dimension: usize,
    ) -> Retriever {
        let mut index = HybridIndex::new(dimension);
        index.add(chunks).unwrap();
        Retriever::new(index, Embedder::new(Arc::new(backend)))
    }

    #[test]
    fn test_boost_is_pure_and_reorders() {
        let input = vec![
            search_result("rules", DocumentKind::Rulebook, 0.80, 1),
            search_result("handbook", DocumentKind::Handbook, 0.80, 2),
        ];

        let boosted = apply_priority_boost(&input, HANDBOOK_BOOST);

        // Input untouched.
        assert_eq!(input[0].score, 0.80);
        assert_eq!(input[1].score, 0.80);

        assert_eq!(boosted[0].chunk_id, "handbook");
        assert!((boosted[0].score - 1.20).abs() < 1e-6);
        assert_eq!(boosted[1].chunk_id, "rules");
        assert!((boosted[1].score - 0.80).abs() < 1e-6);
    }

    #[test]
    fn test_boost_keeps_tie_order_within_kind() {
        let input = vec![
            search_result("r1", DocumentKind::Rulebook, 0.5, 1),
            search_result("r2", DocumentKind::Rulebook, 0.5, 2),
        ];
        let boosted = apply_priority_boost(&input, HANDBOOK_BOOST);
        assert_eq!(boosted[0].chunk_id, "r1");
        assert_eq!(boosted[1].chunk_id, "r2");
    }

    #[tokio::test]
    async fn test_retrieve_reports_method() {
        let backend = StaticBackend::new(2).with_vector("what is scored", vec![1.0, 0.0]);
        let retriever = retriever_with(
            vec![embedded(
                "a",
                DocumentKind::Rulebook,
                "scoring text",
                vec![1.0, 0.0],
            )],
            backend,
            2,
        );

        let hybrid = retriever
            .retrieve("what is scored", None, None, true)
            .await
            .unwrap();
        assert_eq!(hybrid.retrieval_method, "hybrid");
        assert_eq!(hybrid.total_found, 1);

        let semantic = retriever
            .retrieve("what is scored", None, None, false)
            .await
            .unwrap();
        assert_eq!(semantic.retrieval_method, "semantic");
    }

    #[tokio::test]
    async fn test_semantic_kind_filter() {
        let backend = StaticBackend::new(2).with_vector("query", vec![1.0, 0.0]);
        let retriever = retriever_with(
            vec![
                embedded("h", DocumentKind::Handbook, "handbook text", vec![1.0, 0.0]),
                embedded("r", DocumentKind::Rulebook, "rules text", vec![1.0, 0.0]),
            ],
            backend,
            2,
        );

        let result = retriever
            .retrieve("query", None, Some(DocumentKind::Handbook), false)
            .await
            .unwrap();

        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk_id, "h");
    }

    #[tokio::test]
    async fn test_priority_boost_ranks_handbook_first() {
        // Both chunks identical to the query vector: equal base scores.
        let backend = StaticBackend::new(2).with_vector("tied question", vec![1.0, 0.0]);
        let retriever = retriever_with(
            vec![
                embedded("rules", DocumentKind::Rulebook, "rulebook view", vec![1.0, 0.0]),
                embedded("hb", DocumentKind::Handbook, "handbook view", vec![1.0, 0.0]),
            ],
            backend,
            2,
        );

        let result = retriever
            .retrieve_with_priority_boost("tied question", Some(2))
            .await
            .unwrap();

        assert_eq!(result.retrieval_method, "hybrid_with_handbook_boost");
        assert_eq!(result.chunks[0].chunk_id, "hb");
        assert!(result.chunks[0].score > result.chunks[1].score);
        assert_eq!(result.chunks[0].rank, 1);
        assert_eq!(result.chunks[1].rank, 2);
    }

    #[tokio::test]
    async fn test_retrieve_by_rule_id_excludes_neighbors() {
        let backend = StaticBackend::new(2).with_vector("Rule D 4.3.3", vec![1.0, 0.0]);
        let retriever = retriever_with(
            vec![
                embedded(
                    "cited",
                    DocumentKind::Rulebook,
                    "skidpad scoring per D 4.3.3",
                    vec![0.0, 1.0],
                ),
                embedded(
                    "neighbor",
                    DocumentKind::Rulebook,
                    "nearby but uncited text",
                    vec![1.0, 0.0],
                ),
            ],
            backend,
            2,
        );

        let rule_id = RuleId::parse("D 4.3.3").unwrap();
        let results = retriever.retrieve_by_rule_id(&rule_id).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "cited");
    }

    #[tokio::test]
    async fn test_empty_index_retrieval() {
        let retriever = retriever_with(Vec::new(), StaticBackend::new(2), 2);
        let result = retriever.retrieve("anything", None, None, true).await.unwrap();
        assert!(result.chunks.is_empty());
        assert_eq!(result.total_found, 0);
    }

    #[test]
    fn test_format_context_empty_sentinel() {
        let result = RetrievalResult {
            chunks: Vec::new(),
            query: "q".to_string(),
            query_embedding: Vec::new(),
            retrieval_method: "hybrid".to_string(),
            total_found: 0,
        };
        assert_eq!(format_context(&result), "No relevant context found.");
    }

    #[test]
    fn test_format_context_lists_chunks() {
        let result = RetrievalResult {
            chunks: vec![search_result("a", DocumentKind::Handbook, 0.913, 1)],
            query: "q".to_string(),
            query_embedding: Vec::new(),
            retrieval_method: "hybrid".to_string(),
            total_found: 1,
        };

        let context = format_context(&result);
        assert!(context.contains("Retrieved Rule Sections"));
        assert!(context.contains("Handbook (Pages 1-5)"));
        assert!(context.contains("[Relevance: 0.913]"));
        assert!(context.contains("text of a"));
    }
}
