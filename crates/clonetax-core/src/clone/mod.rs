//! The cloning engine: preflight checks, traversal planning and the
//! orchestrator that drives term, meta and relationship duplication.

mod meta;
mod progress;
mod relationships;

pub use progress::{NullProgress, ProgressSink};

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use crate::error::{CloneError, Result};
use crate::store::ContentStore;
use crate::types::{sanitize_meta_key, CloneStats, Term};

/// Parameters for one clone run.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub source_taxonomy: String,
    pub target_taxonomy: String,
    /// Post type whose relationships are migrated.
    pub post_type: String,
    /// Meta keys to leave behind, in sanitized form.
    pub skip_meta_keys: BTreeSet<String>,
}

impl CloneRequest {
    /// Request with the default post type (`post`) and no meta exclusions.
    pub fn new(source_taxonomy: impl Into<String>, target_taxonomy: impl Into<String>) -> Self {
        Self {
            source_taxonomy: source_taxonomy.into(),
            target_taxonomy: target_taxonomy.into(),
            post_type: "post".to_string(),
            skip_meta_keys: BTreeSet::new(),
        }
    }

    pub fn with_post_type(mut self, post_type: impl Into<String>) -> Self {
        self.post_type = post_type.into();
        self
    }

    /// Set the exclusion keys. Each entry is normalized to its storage-safe
    /// form; entries that sanitize to nothing are dropped.
    pub fn with_skip_meta_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.skip_meta_keys = keys
            .into_iter()
            .map(|k| sanitize_meta_key(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();
        self
    }
}

/// Source term id → target term id mapping, built one entry per created
/// term and consulted to resolve parent references.
#[derive(Debug, Default)]
struct TermMap {
    map: HashMap<i64, i64>,
}

impl TermMap {
    fn insert(&mut self, source_id: i64, target_id: i64) {
        self.map.insert(source_id, target_id);
    }

    /// Map a source parent reference onto the target hierarchy. A parent
    /// that has not been cloned yet (orphaned or in a cycle) maps to root.
    fn resolve_parent(&self, source_parent: i64) -> i64 {
        if source_parent == 0 {
            return 0;
        }
        self.map.get(&source_parent).copied().unwrap_or(0)
    }
}

/// State owned by one clone run: the id remapping plus the counters.
#[derive(Debug, Default)]
struct RunContext {
    term_map: TermMap,
    stats: CloneStats,
}

/// Clones a taxonomy's terms, term meta and post relationships into an
/// empty target taxonomy.
///
/// Single-threaded and sequential: every store call blocks, one term is
/// processed at a time, and the first failure aborts the run. There is no
/// cross-call transaction, so an aborted run leaves the target partially
/// populated.
pub struct TaxonomyCloner<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> TaxonomyCloner<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Run the clone, reporting one progress tick per completed term.
    pub fn run(
        &self,
        request: &CloneRequest,
        progress: &mut dyn ProgressSink,
    ) -> Result<CloneStats> {
        self.preflight(request)?;

        let terms = self.store.list_terms(&request.source_taxonomy)?;
        let order = plan_order(&terms);

        info!(
            total = terms.len(),
            source = %request.source_taxonomy,
            target = %request.target_taxonomy,
            "cloning terms"
        );
        progress.begin(terms.len() as u64);

        let mut ctx = RunContext::default();
        for index in order {
            let term = &terms[index];
            self.clone_one_term(request, term, &mut ctx)?;
            progress.tick();
        }

        progress.finish();
        info!("{}", ctx.stats.summary());
        Ok(ctx.stats)
    }

    /// Fail fast before any mutation: both taxonomies and the post type
    /// must exist, and the target must hold no terms at all.
    fn preflight(&self, request: &CloneRequest) -> Result<()> {
        if !self.store.taxonomy_exists(&request.source_taxonomy)? {
            return Err(CloneError::MissingSourceTaxonomy(
                request.source_taxonomy.clone(),
            ));
        }
        if !self.store.taxonomy_exists(&request.target_taxonomy)? {
            return Err(CloneError::MissingTargetTaxonomy(
                request.target_taxonomy.clone(),
            ));
        }
        if !self.store.post_type_exists(&request.post_type)? {
            return Err(CloneError::MissingPostType(request.post_type.clone()));
        }
        let term_count = self.store.count_terms(&request.target_taxonomy)?;
        if term_count > 0 {
            return Err(CloneError::TargetTaxonomyNotEmpty {
                taxonomy: request.target_taxonomy.clone(),
                term_count,
            });
        }
        Ok(())
    }

    fn clone_one_term(
        &self,
        request: &CloneRequest,
        term: &Term,
        ctx: &mut RunContext,
    ) -> Result<()> {
        debug!(
            source_id = term.term_id,
            name = %term.name,
            "processing source term"
        );

        let parent = ctx.term_map.resolve_parent(term.parent);
        let created = self.store.create_term(
            &request.target_taxonomy,
            &term.name,
            &term.slug,
            &term.description,
            parent,
        )?;
        ctx.stats.terms += 1;
        ctx.term_map.insert(term.term_id, created.term_id);

        meta::clone_term_meta(
            self.store,
            term.term_id,
            created.term_id,
            &request.skip_meta_keys,
            &mut ctx.stats,
        )?;

        relationships::clone_term_relationships(
            self.store,
            &request.post_type,
            &request.source_taxonomy,
            &request.target_taxonomy,
            term.term_id,
            created.term_id,
            &mut ctx.stats,
        )?;

        Ok(())
    }
}

/// Plan the processing order over the source terms (given in ascending-id
/// order): breadth-first from the roots, so every parent is created, and
/// remapped, before any of its children.
///
/// A term whose parent id does not exist in the listing (or points at
/// itself) is treated as a root candidate and will fall back to parent 0.
/// Members of parent cycles never reach the queue; they are appended at the
/// end in ascending-id order and resolve their parents best-effort.
fn plan_order(terms: &[Term]) -> Vec<usize> {
    let known_ids: HashSet<i64> = terms.iter().map(|t| t.term_id).collect();

    let mut children: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (index, term) in terms.iter().enumerate() {
        let parented =
            term.parent != 0 && term.parent != term.term_id && known_ids.contains(&term.parent);
        if parented {
            // Ascending input order keeps each child list ascending too.
            children.entry(term.parent).or_default().push(index);
        } else {
            if term.parent != 0 {
                warn!(
                    term_id = term.term_id,
                    parent = term.parent,
                    "term has an unknown parent, cloning as root"
                );
            }
            queue.push_back(index);
        }
    }

    let mut order = Vec::with_capacity(terms.len());
    let mut visited = vec![false; terms.len()];
    while let Some(index) = queue.pop_front() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        order.push(index);
        if let Some(kids) = children.get(&terms[index].term_id) {
            queue.extend(kids.iter().copied());
        }
    }

    // Leftovers are cycle members (and their subtrees); append them in
    // ascending-id order and let parent resolution fall back to root.
    for (index, seen) in visited.iter().enumerate() {
        if !seen {
            warn!(
                term_id = terms[index].term_id,
                "term unreachable from any root, appending"
            );
            order.push(index);
        }
    }

    order
}
