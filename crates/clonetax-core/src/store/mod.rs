//! Content store contracts and backends.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::types::{CreatedTerm, Term};

/// Narrow capability interface over the content-management store.
///
/// The cloning engine only ever talks to the store through this trait, so it
/// can run against the SQLite backend or an in-memory fake interchangeably.
/// All operations are synchronous, blocking calls; consistency is whatever
/// the backend guarantees per call — there is no cross-call transaction.
pub trait ContentStore: Send + Sync {
    /// Whether a taxonomy with this name is registered.
    fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool>;

    /// Whether a post type with this name is registered.
    fn post_type_exists(&self, post_type: &str) -> Result<bool>;

    /// Number of terms in a taxonomy, counting empty and hidden ones.
    fn count_terms(&self, taxonomy: &str) -> Result<u64>;

    /// All terms in a taxonomy ordered by ascending term identifier,
    /// including terms with no associated posts.
    fn list_terms(&self, taxonomy: &str) -> Result<Vec<Term>>;

    /// Create a term in a taxonomy.
    ///
    /// Fails on a slug collision with any existing term in the same
    /// taxonomy, hidden or not.
    fn create_term(
        &self,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
        parent: i64,
    ) -> Result<CreatedTerm>;

    /// All meta for a term, as key → ordered values. A key may carry
    /// multiple values; multiplicity and insertion order are preserved.
    fn term_meta(&self, term_id: i64) -> Result<BTreeMap<String, Vec<Value>>>;

    /// Append one meta value under a key for a term. Never overwrites;
    /// repeated keys accumulate values.
    fn add_term_meta(&self, term_id: i64, key: &str, value: &Value) -> Result<()>;

    /// Identifiers of posts of the given type directly associated with a
    /// term. Descendant-term associations are not included.
    fn posts_for_term(&self, post_type: &str, taxonomy: &str, term_id: i64) -> Result<Vec<i64>>;

    /// Associate terms with a post, in append mode: existing relationships
    /// on the post (in any taxonomy) are preserved, and re-adding an
    /// existing relationship is a no-op.
    fn append_post_terms(&self, post_id: i64, term_ids: &[i64], taxonomy: &str) -> Result<()>;
}
