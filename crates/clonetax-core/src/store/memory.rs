//! In-memory content store.
//!
//! Implements the same contracts as the SQLite backend, entirely in process
//! memory. Used by the engine's test suite; also handy for embedding the
//! cloner against data that never touches disk.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::ContentStore;
use crate::error::{CloneError, Result};
use crate::types::{CreatedTerm, Term};

#[derive(Default)]
struct Inner {
    taxonomies: BTreeSet<String>,
    post_types: BTreeSet<String>,
    terms: BTreeMap<i64, Term>,
    /// term_id → taxonomy-scoped identifier.
    term_taxonomy_ids: BTreeMap<i64, i64>,
    /// term_id → meta rows in insertion order.
    meta: BTreeMap<i64, Vec<(String, Value)>>,
    /// post_id → post type.
    posts: BTreeMap<i64, String>,
    /// (post_id, term_id) links.
    relationships: BTreeSet<(i64, i64)>,
    next_term_id: i64,
    next_term_taxonomy_id: i64,
    next_post_id: i64,
    /// Test hook: slug whose creation should fail.
    fail_create_slug: Option<String>,
}

/// In-memory content store, thread-safe via an internal mutex.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|e| CloneError::Database {
            message: format!("Failed to lock store: {}", e),
            source: None,
        })
    }

    /// Register a taxonomy name. Idempotent.
    pub fn register_taxonomy(&self, taxonomy: &str) -> Result<()> {
        self.lock()?.taxonomies.insert(taxonomy.to_string());
        Ok(())
    }

    /// Register a post type name. Idempotent.
    pub fn register_post_type(&self, post_type: &str) -> Result<()> {
        self.lock()?.post_types.insert(post_type.to_string());
        Ok(())
    }

    /// Insert a post of the given type, returning its identifier.
    pub fn insert_post(&self, post_type: &str) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.next_post_id += 1;
        let id = inner.next_post_id;
        inner.posts.insert(id, post_type.to_string());
        Ok(id)
    }

    /// Rewrite a term's parent pointer. Seeding helper for building
    /// hierarchies whose child identifiers precede their parents'.
    pub fn set_term_parent(&self, term_id: i64, parent: i64) -> Result<()> {
        let mut inner = self.lock()?;
        let term = inner
            .terms
            .get_mut(&term_id)
            .ok_or(CloneError::TermNotFound {
                term_id,
                taxonomy: String::new(),
            })?;
        term.parent = parent;
        Ok(())
    }

    /// Test hook: make the next creations of a term with this slug fail,
    /// simulating a storage-layer rejection mid-run.
    pub fn fail_creates_with_slug(&self, slug: &str) -> Result<()> {
        self.lock()?.fail_create_slug = Some(slug.to_string());
        Ok(())
    }

    /// Term identifiers currently associated with a post, across all
    /// taxonomies. Assertion helper.
    pub fn post_term_ids(&self, post_id: i64) -> Result<Vec<i64>> {
        let inner = self.lock()?;
        Ok(inner
            .relationships
            .iter()
            .filter(|(p, _)| *p == post_id)
            .map(|(_, t)| *t)
            .collect())
    }
}

impl ContentStore for MemoryStore {
    fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool> {
        Ok(self.lock()?.taxonomies.contains(taxonomy))
    }

    fn post_type_exists(&self, post_type: &str) -> Result<bool> {
        Ok(self.lock()?.post_types.contains(post_type))
    }

    fn count_terms(&self, taxonomy: &str) -> Result<u64> {
        let inner = self.lock()?;
        Ok(inner
            .terms
            .values()
            .filter(|t| t.taxonomy == taxonomy)
            .count() as u64)
    }

    fn list_terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        let inner = self.lock()?;
        // BTreeMap iteration gives ascending term_id order.
        Ok(inner
            .terms
            .values()
            .filter(|t| t.taxonomy == taxonomy)
            .cloned()
            .collect())
    }

    fn create_term(
        &self,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
        parent: i64,
    ) -> Result<CreatedTerm> {
        let mut inner = self.lock()?;

        if inner.fail_create_slug.as_deref() == Some(slug) {
            return Err(CloneError::TermCreation {
                name: name.to_string(),
                taxonomy: taxonomy.to_string(),
                message: "storage layer rejected the term".to_string(),
            });
        }
        let collision = inner
            .terms
            .values()
            .find(|t| t.taxonomy == taxonomy && t.slug == slug);
        if let Some(existing) = collision {
            return Err(CloneError::TermCreation {
                name: name.to_string(),
                taxonomy: taxonomy.to_string(),
                message: format!("slug '{}' already used by term {}", slug, existing.term_id),
            });
        }

        inner.next_term_id += 1;
        inner.next_term_taxonomy_id += 1;
        let term_id = inner.next_term_id;
        let term_taxonomy_id = inner.next_term_taxonomy_id;
        inner.terms.insert(
            term_id,
            Term {
                term_id,
                name: name.to_string(),
                slug: slug.to_string(),
                description: description.to_string(),
                parent,
                taxonomy: taxonomy.to_string(),
            },
        );
        inner.term_taxonomy_ids.insert(term_id, term_taxonomy_id);

        Ok(CreatedTerm {
            term_id,
            term_taxonomy_id,
        })
    }

    fn term_meta(&self, term_id: i64) -> Result<BTreeMap<String, Vec<Value>>> {
        let inner = self.lock()?;
        let mut out: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        if let Some(rows) = inner.meta.get(&term_id) {
            for (key, value) in rows {
                out.entry(key.clone()).or_default().push(value.clone());
            }
        }
        Ok(out)
    }

    fn add_term_meta(&self, term_id: i64, key: &str, value: &Value) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .meta
            .entry(term_id)
            .or_default()
            .push((key.to_string(), value.clone()));
        Ok(())
    }

    fn posts_for_term(&self, post_type: &str, taxonomy: &str, term_id: i64) -> Result<Vec<i64>> {
        let inner = self.lock()?;
        let in_taxonomy = inner
            .terms
            .get(&term_id)
            .is_some_and(|t| t.taxonomy == taxonomy);
        if !in_taxonomy {
            return Ok(Vec::new());
        }
        Ok(inner
            .relationships
            .iter()
            .filter(|(post_id, linked_term)| {
                *linked_term == term_id
                    && inner.posts.get(post_id).map(String::as_str) == Some(post_type)
            })
            .map(|(post_id, _)| *post_id)
            .collect())
    }

    fn append_post_terms(&self, post_id: i64, term_ids: &[i64], taxonomy: &str) -> Result<()> {
        let mut inner = self.lock()?;
        for &term_id in term_ids {
            let known = inner
                .terms
                .get(&term_id)
                .is_some_and(|t| t.taxonomy == taxonomy);
            if !known {
                return Err(CloneError::TermNotFound {
                    term_id,
                    taxonomy: taxonomy.to_string(),
                });
            }
            // BTreeSet insert keeps re-adding an existing link a no-op.
            inner.relationships.insert((post_id, term_id));
        }
        Ok(())
    }
}
