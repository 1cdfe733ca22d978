//! Rule identifiers
//!
//! Competition documents cite clauses with tokens like `D 4.3.3` or
//! `AT 8.2.1`: a one- or two-letter section prefix followed by a dotted
//! numeric path. These identifiers drive the keyword side of hybrid search,
//! so parsing and normalization live in one place.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

// Requires at least two numeric components so bare section letters followed
// by a stray number ("D 4") are not treated as clause citations.
static RE_RULE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{1,2})\s*(\d+(?:\.\d+)+)").unwrap());

/// Maximum dotted components kept per identifier (e.g. `D 4.3.3`).
const MAX_COMPONENTS: usize = 3;

/// A structured clause citation: prefix letters plus a dotted numeric path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId {
    pub prefix: String,
    pub path: Vec<u32>,
}

impl RuleId {
    /// Parse a single identifier from a string like "D 4.3.3" or "D4.3.3".
    ///
    /// Returns `None` when the string does not hold exactly one identifier
    /// shaped token.
    pub fn parse(input: &str) -> Option<Self> {
        let caps = RE_RULE_ID.captures(input.trim())?;
        let prefix = caps.get(1)?.as_str().to_string();
        let path: Vec<u32> = caps
            .get(2)?
            .as_str()
            .split('.')
            .take(MAX_COMPONENTS)
            .filter_map(|part| part.parse().ok())
            .collect();

        if path.len() < 2 {
            return None;
        }

        Some(RuleId { prefix, path })
    }

    /// Canonical form with a single separating space: "D 4.3.3".
    pub fn canonical(&self) -> String {
        format!("{} {}", self.prefix, self.dotted_path())
    }

    /// Whitespace-free form used for lookup matching: "D4.3.3".
    pub fn compact(&self) -> String {
        format!("{}{}", self.prefix, self.dotted_path())
    }

    fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Extract every rule identifier from a block of text.
///
/// Duplicates are removed and the result sorted so extraction is
/// deterministic regardless of the order matches appear in.
pub fn extract_rule_ids(text: &str) -> Vec<RuleId> {
    let mut ids: Vec<RuleId> = RE_RULE_ID
        .captures_iter(text)
        .filter_map(|caps| {
            let prefix = caps.get(1)?.as_str().to_string();
            let path: Vec<u32> = caps
                .get(2)?
                .as_str()
                .split('.')
                .take(MAX_COMPONENTS)
                .filter_map(|part| part.parse().ok())
                .collect();
            if path.len() < 2 {
                return None;
            }
            Some(RuleId { prefix, path })
        })
        .collect();

    ids.sort();
    ids.dedup();
    ids
}
