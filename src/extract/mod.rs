//! Document extraction
//!
//! Turns a source PDF into an ordered sequence of pages of raw text plus any
//! tabular data the extractor could recover. Extraction is a build-time step:
//! the resulting [`Document`] is immutable and everything downstream
//! (chunking, statistics, rule-id views) derives from it.

mod pdf;

pub use pdf::PdfExtractor;

use serde::{Deserialize, Serialize};

use crate::rules::{extract_rule_ids, RuleId};

/// Which source a document is, inferred from its filename.
///
/// The competition handbook is the authoritative source and outranks the
/// technical rulebook when retrieval scores tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Handbook,
    Rulebook,
    Unknown,
}

impl DocumentKind {
    /// Classify a filename by substring match.
    ///
    /// Unmatched files classify as [`DocumentKind::Unknown`] and are still
    /// processed.
    pub fn from_filename(filename: &str) -> Self {
        if filename.contains("Handbook") {
            DocumentKind::Handbook
        } else if filename.contains("Rules") {
            DocumentKind::Rulebook
        } else {
            DocumentKind::Unknown
        }
    }

    /// Short lowercase tag used in chunk ids and artifact filenames.
    pub fn slug(&self) -> &'static str {
        match self {
            DocumentKind::Handbook => "handbook",
            DocumentKind::Rulebook => "rulebook",
            DocumentKind::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "handbook" => Ok(DocumentKind::Handbook),
            "rulebook" | "rules" => Ok(DocumentKind::Rulebook),
            "unknown" => Ok(DocumentKind::Unknown),
            other => Err(format!(
                "unknown document kind '{other}' (expected handbook, rulebook, or unknown)"
            )),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::Handbook => "Handbook",
            DocumentKind::Rulebook => "Rulebook",
            DocumentKind::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Tabular data recovered from a page, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// A single extracted page. Text may be empty when the source page has no
/// extractable text; that is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
}

/// A fully extracted source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    pub kind: DocumentKind,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }
}

/// Read-only statistics over an extracted document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatistics {
    pub filename: String,
    pub kind: DocumentKind,
    pub total_pages: usize,
    pub total_characters: usize,
    pub total_words: usize,
    pub avg_chars_per_page: usize,
    pub unique_rule_ids: usize,
}

/// Derive summary statistics for a document without mutating it.
pub fn document_statistics(document: &Document) -> DocumentStatistics {
    let total_characters: usize = document.pages.iter().map(|p| p.text.len()).sum();
    let total_words: usize = document
        .pages
        .iter()
        .map(|p| p.text.split_whitespace().count())
        .sum();

    let mut rule_ids: Vec<RuleId> = Vec::new();
    for page in &document.pages {
        rule_ids.extend(extract_rule_ids(&page.text));
    }
    rule_ids.sort();
    rule_ids.dedup();

    DocumentStatistics {
        filename: document.filename.clone(),
        kind: document.kind,
        total_pages: document.total_pages(),
        total_characters,
        total_words,
        avg_chars_per_page: if document.pages.is_empty() {
            0
        } else {
            total_characters / document.pages.len()
        },
        unique_rule_ids: rule_ids.len(),
    }
}
