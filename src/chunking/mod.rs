//! Document chunking
//!
//! Splits extracted documents into overlapping, semantically bounded chunks.
//! Pages are grouped into fixed windows so cross-page context survives, then
//! each window's text is cut near a target size, preferring section or rule
//! boundaries, with a trailing overlap carried into the next chunk.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::extract::{Document, DocumentKind};
use crate::rules::{extract_rule_ids, RuleId};

// Heading shapes that mark a section boundary: a rule id at line start, a
// numbered section ("4.3 SCORING"), or an all-caps heading line. Approximate
// by design; body text in all caps can false-positive.
static RE_BOUNDARY_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}\s*\d+(?:\.\d+)+").unwrap());
static RE_BOUNDARY_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\s+[A-Z]").unwrap());
static RE_BOUNDARY_CAPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z\s]{5,}$").unwrap());

/// Provenance and derived metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_kind: DocumentKind,
    pub filename: String,
    pub page_range: (u32, u32),
    pub rule_ids: Vec<RuleId>,
    pub chunk_number: usize,
}

/// A bounded span of document text stored as a retrievable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub char_count: usize,
    pub word_count: usize,
}

/// Splits documents at semantic boundaries into overlapping chunks.
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    /// Target chunk size in characters.
    pub target_size: usize,
    /// Overlap carried between adjacent chunks, in characters.
    pub overlap_size: usize,
    /// Chunks shorter than this are dropped.
    pub min_size: usize,
    /// Pages grouped per chunking window.
    pub page_window: usize,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self {
            target_size: 2000,
            overlap_size: 200,
            min_size: 100,
            page_window: 5,
        }
    }
}

impl DocumentChunker {
    pub fn new(target_size: usize, overlap_size: usize, min_size: usize) -> Self {
        Self {
            target_size,
            overlap_size,
            min_size,
            ..Self::default()
        }
    }

    /// Chunk an entire document.
    ///
    /// Chunk ids use a per-document monotonic counter, so they stay unique
    /// across page windows.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut counter = 0usize;

        for window in document.pages.chunks(self.page_window.max(1)) {
            if window.is_empty() {
                continue;
            }

            let combined = window
                .iter()
                .map(|page| format!("--- Page {} ---\n{}", page.page_number, page.text))
                .collect::<Vec<_>>()
                .join("\n\n");

            let page_range = (
                window.first().map(|p| p.page_number).unwrap_or(1),
                window.last().map(|p| p.page_number).unwrap_or(1),
            );

            self.split_window(
                &combined,
                document,
                page_range,
                &mut counter,
                &mut chunks,
            );
        }

        tracing::debug!(
            "created {} chunks from {}",
            chunks.len(),
            document.filename
        );
        chunks
    }

    /// Split one window's combined text at semantic boundaries.
    fn split_window(
        &self,
        text: &str,
        document: &Document,
        page_range: (u32, u32),
        counter: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        let mut buffer: Vec<String> = Vec::new();
        let mut buffer_size = 0usize;

        for line in text.split('\n') {
            let line_size = line.len() + 1; // +1 for the newline

            if buffer_size + line_size > self.target_size && !buffer.is_empty() {
                let at_boundary = is_section_boundary(line);

                if at_boundary || buffer_size >= self.target_size {
                    self.close_chunk(&buffer, document, page_range, counter, out);

                    let overlap = self.overlap_lines(&buffer);
                    buffer_size = overlap.iter().map(|l| l.len() + 1).sum();
                    buffer = overlap;
                }
            }

            buffer.push(line.to_string());
            buffer_size += line_size;
        }

        if !buffer.is_empty() {
            let remaining = buffer.join("\n");
            // A document shorter than min_size still yields its single
            // short chunk; trailing short buffers are otherwise dropped.
            if remaining.trim().len() >= self.min_size || (*counter == 0 && out.is_empty()) {
                out.push(self.build_chunk(&remaining, document, page_range, *counter));
                *counter += 1;
            }
        }
    }

    fn close_chunk(
        &self,
        buffer: &[String],
        document: &Document,
        page_range: (u32, u32),
        counter: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        let text = buffer.join("\n");
        if text.trim().len() >= self.min_size {
            out.push(self.build_chunk(&text, document, page_range, *counter));
            *counter += 1;
        }
    }

    /// Lines from the end of a closed buffer that fit within the overlap
    /// budget, in original order.
    fn overlap_lines(&self, buffer: &[String]) -> Vec<String> {
        let mut overlap = Vec::new();
        let mut size = 0usize;

        for line in buffer.iter().rev() {
            let line_size = line.len() + 1;
            if size + line_size > self.overlap_size {
                break;
            }
            overlap.push(line.clone());
            size += line_size;
        }

        overlap.reverse();
        overlap
    }

    fn build_chunk(
        &self,
        text: &str,
        document: &Document,
        page_range: (u32, u32),
        chunk_number: usize,
    ) -> Chunk {
        let trimmed = text.trim();
        let rule_ids = extract_rule_ids(trimmed);

        Chunk {
            chunk_id: format!("{}_{}", document.kind.slug(), chunk_number),
            text: trimmed.to_string(),
            metadata: ChunkMetadata {
                document_kind: document.kind,
                filename: document.filename.clone(),
                page_range,
                rule_ids,
                chunk_number,
            },
            char_count: trimmed.len(),
            word_count: trimmed.split_whitespace().count(),
        }
    }
}

/// Whether a line looks like the start of a new section.
fn is_section_boundary(line: &str) -> bool {
    let line = line.trim();
    RE_BOUNDARY_RULE.is_match(line)
        || RE_BOUNDARY_NUMBERED.is_match(line)
        || RE_BOUNDARY_CAPS.is_match(line)
}

/// Read-only statistics over a chunk sequence.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkStatistics {
    pub total_chunks: usize,
    pub avg_chunk_size: usize,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub total_characters: usize,
    pub total_words: usize,
}

pub fn chunk_statistics(chunks: &[Chunk]) -> Option<ChunkStatistics> {
    if chunks.is_empty() {
        return None;
    }

    let sizes: Vec<usize> = chunks.iter().map(|c| c.char_count).collect();
    let total_characters: usize = sizes.iter().sum();

    Some(ChunkStatistics {
        total_chunks: chunks.len(),
        avg_chunk_size: total_characters / chunks.len(),
        min_chunk_size: *sizes.iter().min().unwrap(),
        max_chunk_size: *sizes.iter().max().unwrap(),
        total_characters,
        total_words: chunks.iter().map(|c| c.word_count).sum(),
    })
}
