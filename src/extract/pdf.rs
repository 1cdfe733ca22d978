//! PDF extraction backed by `pdf-extract`
//!
//! Two methods, tried in order: page-accurate extraction keeps true page
//! boundaries and feeds the table heuristic per page; if that fails, a
//! plain whole-document pass is split into pages on the form-feed characters
//! the extractor inserts between pages. Only both methods failing is fatal
//! for a document.

use std::path::Path;

use crate::errors::{AssistantError, Result};
use crate::extract::{Document, DocumentKind, Page, Table};

/// Minimum consecutive columned lines before a run is treated as a table.
const MIN_TABLE_ROWS: usize = 2;

/// Extracts [`Document`]s from PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        PdfExtractor
    }

    /// Process a PDF into a [`Document`].
    ///
    /// The file must exist; a missing path is reported before any parsing.
    pub fn process(&self, path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(AssistantError::MissingSource(path.to_path_buf()));
        }

        let pages = match self.extract_by_pages(path) {
            Ok(pages) => pages,
            Err(primary_err) => {
                tracing::warn!(
                    "page-accurate extraction failed for {}: {primary_err}, \
                     falling back to plain extraction",
                    path.display()
                );
                self.extract_plain(path)?
            }
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = DocumentKind::from_filename(&filename);

        Ok(Document {
            filename,
            kind,
            pages,
        })
    }

    /// Primary method: one string per source page.
    fn extract_by_pages(&self, path: &Path) -> std::result::Result<Vec<Page>, String> {
        let page_texts =
            pdf_extract::extract_text_by_pages(path).map_err(|e| e.to_string())?;

        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| {
                let tables = detect_tables(&text);
                Page {
                    page_number: idx as u32 + 1,
                    text,
                    tables,
                }
            })
            .collect();

        Ok(pages)
    }

    /// Fallback method: whole-document text split on form feeds.
    fn extract_plain(&self, path: &Path) -> Result<Vec<Page>> {
        let text = pdf_extract::extract_text(path).map_err(|e| AssistantError::Extraction {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // pdf-extract inserts \x0C between pages; without them the whole
        // text becomes a single page rather than failing.
        let raw_pages: Vec<&str> = if text.contains('\x0C') {
            text.split('\x0C').collect()
        } else {
            vec![text.as_str()]
        };

        let pages = raw_pages
            .into_iter()
            .enumerate()
            .map(|(idx, page_text)| Page {
                page_number: idx as u32 + 1,
                text: page_text.to_string(),
                tables: detect_tables(page_text),
            })
            .collect();

        Ok(pages)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic table capture: runs of consecutive lines that each split into
/// two or more columns (separated by tabs or 2+ spaces) become one table.
fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let cells = split_columns(line);
        if cells.len() >= 2 {
            current.push(cells);
        } else {
            if current.len() >= MIN_TABLE_ROWS {
                tables.push(Table {
                    rows: std::mem::take(&mut current),
                });
            }
            current.clear();
        }
    }

    if current.len() >= MIN_TABLE_ROWS {
        tables.push(Table { rows: current });
    }

    tables
}

fn split_columns(line: &str) -> Vec<String> {
    line.split('\t')
        .flat_map(|part| part.split("  "))
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.to_string())
        .collect()
}
