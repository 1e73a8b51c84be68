//! Core data model: terms, creation results and run statistics.

use serde::{Deserialize, Serialize};

/// A classification term within a taxonomy.
///
/// Source terms are immutable inputs to a clone run; target terms are
/// created exactly once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Identifier, unique within the content store.
    pub term_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Parent term identifier; 0 means root.
    pub parent: i64,
    /// Taxonomy this term belongs to.
    pub taxonomy: String,
}

impl Term {
    /// Whether this term sits at the top of its taxonomy's hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent == 0
    }
}

/// Identifier pair returned when a term is created: the term identifier
/// plus the taxonomy-scoped identifier used by post relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTerm {
    pub term_id: i64,
    pub term_taxonomy_id: i64,
}

/// Counters accumulated over one clone run.
///
/// All counters are monotonically increasing: zeroed at the start of a run,
/// read once at the end for the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CloneStats {
    /// Terms created in the target taxonomy.
    pub terms: u64,
    /// Meta key groups processed (one per key, excluded or not).
    pub meta_groups: u64,
    /// Individual meta values copied.
    pub meta_values: u64,
    /// Individual meta values skipped via the exclusion set.
    pub meta_values_skipped: u64,
    /// Post relationships created (one per post processed).
    pub relationships: u64,
}

impl CloneStats {
    /// One-line completion summary.
    pub fn summary(&self) -> String {
        format!(
            "Done! Cloned {} terms, with {} meta values copied and {} skipped (total {} meta groups) and {} post relationships duplicated.",
            self.terms, self.meta_values, self.meta_values_skipped, self.meta_groups, self.relationships
        )
    }
}

/// Normalize a user-supplied meta key to its storage-safe form.
///
/// Lowercases and strips everything outside `[a-z0-9_-]`, matching how keys
/// are sanitized before they reach the meta tables, so exclusion-set entries
/// compare against stored keys exactly.
pub fn sanitize_meta_key(key: &str) -> String {
    key.trim()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '-' => Some(c),
            'A'..='Z' => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect()
}
