//! Build pipeline
//!
//! Drives extract → chunk → embed → index for the configured source
//! documents, writing the JSON interchange artifacts at each stage and an
//! index snapshot at the end. Build-time failures halt the run with a
//! diagnostic naming the resource; nothing partial is indexed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::chunking::{chunk_statistics, Chunk, DocumentChunker};
use crate::config::Config;
use crate::embedding::{load_embeddings, save_embeddings, Embedder};
use crate::errors::{AssistantError, Result};
use crate::extract::{document_statistics, PdfExtractor};
use crate::index::HybridIndex;

const PROCESSED_DIR: &str = "processed";
const EMBEDDINGS_DIR: &str = "embeddings";
const INDEX_DIR: &str = "index";

/// Summary of one ingest run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub snapshot_dir: PathBuf,
}

/// Orchestrates the build-time flow for all configured documents.
pub struct IngestPipeline {
    extractor: PdfExtractor,
    chunker: DocumentChunker,
    embedder: Embedder,
    data_dir: PathBuf,
}

impl IngestPipeline {
    pub fn new(embedder: Embedder, config: &Config, data_dir: PathBuf) -> Self {
        let retrieval = &config.retrieval;
        let chunker = DocumentChunker {
            target_size: retrieval.chunk_size,
            overlap_size: retrieval.chunk_overlap,
            min_size: retrieval.min_chunk_size,
            page_window: retrieval.page_window,
        };

        Self {
            extractor: PdfExtractor::new(),
            chunker,
            embedder,
            data_dir,
        }
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join(INDEX_DIR)
    }

    /// Run the full pipeline over the given sources.
    pub async fn run(&self, sources: &[PathBuf]) -> Result<IngestReport> {
        if sources.is_empty() {
            return Err(AssistantError::Config(
                "no source documents configured".to_string(),
            ));
        }

        let mut all_embedded = Vec::new();
        let mut total_chunks = 0usize;

        for source in sources {
            let document = self.extractor.process(source)?;
            let doc_stats = document_statistics(&document);
            tracing::info!(
                "extracted {} pages ({} words, {} rule ids) from {}",
                doc_stats.total_pages,
                doc_stats.total_words,
                doc_stats.unique_rule_ids,
                document.filename
            );

            let chunks = self.chunker.chunk_document(&document);
            if let Some(stats) = chunk_statistics(&chunks) {
                tracing::info!(
                    "{}: {} chunks, avg size {} chars",
                    document.filename,
                    stats.total_chunks,
                    stats.avg_chunk_size
                );
            }
            total_chunks += chunks.len();

            let slug = document.kind.slug();
            save_chunks(
                &chunks,
                &self.data_dir.join(PROCESSED_DIR).join(format!("{slug}_chunks.json")),
            )?;

            let embedded = self.embedder.embed_chunks(&chunks, true).await?;
            save_embeddings(
                &embedded,
                &self
                    .data_dir
                    .join(EMBEDDINGS_DIR)
                    .join(format!("{slug}_embeddings.json")),
            )?;

            all_embedded.extend(embedded);
        }

        let dimension = all_embedded
            .first()
            .map(|chunk| chunk.embedding.len())
            .ok_or_else(|| {
                AssistantError::Config("no chunks produced from any source".to_string())
            })?;

        let mut index = HybridIndex::new(dimension);
        index.add(all_embedded)?;

        let snapshot_dir = self.snapshot_dir();
        index.save(&snapshot_dir)?;

        Ok(IngestReport {
            documents: sources.len(),
            chunks: total_chunks,
            snapshot_dir,
        })
    }
}

/// Persist chunk records as the build-time interchange JSON.
pub fn save_chunks(chunks: &[Chunk], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(chunks)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load chunk records saved by [`save_chunks`]. Missing fields are fatal.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| AssistantError::MalformedRecord {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Rebuild a hybrid index from persisted embedding files.
///
/// Files that do not exist are skipped with a warning, matching the build
/// artifacts being optional per document kind; loading nothing at all is an
/// error since the index dimension would be undefined.
pub fn build_index_from_embeddings(paths: &[PathBuf]) -> Result<HybridIndex> {
    let mut all_embedded = Vec::new();

    for path in paths {
        if !path.exists() {
            tracing::warn!("embeddings not found: {}", path.display());
            continue;
        }
        all_embedded.extend(load_embeddings(path)?);
    }

    let dimension = all_embedded
        .first()
        .map(|chunk| chunk.embedding.len())
        .ok_or_else(|| {
            AssistantError::Config("no embedding files could be loaded".to_string())
        })?;

    let mut index = HybridIndex::new(dimension);
    index.add(all_embedded)?;
    Ok(index)
}

/// Load the index snapshot written by a previous ingest run.
pub fn load_index(data_dir: &Path) -> Result<HybridIndex> {
    HybridIndex::load(&data_dir.join(INDEX_DIR))
}
