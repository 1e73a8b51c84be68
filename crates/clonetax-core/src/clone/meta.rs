//! Per-term meta duplication.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::store::ContentStore;
use crate::types::CloneStats;

/// Copy all meta from one term to another, honoring the exclusion set.
///
/// Values are appended under the target term, so a key that carries several
/// values keeps its multiplicity. An excluded key skips every value it
/// holds; either way the key counts as one processed meta group.
pub(super) fn clone_term_meta(
    store: &dyn ContentStore,
    source_term: i64,
    target_term: i64,
    skip_keys: &BTreeSet<String>,
    stats: &mut CloneStats,
) -> Result<()> {
    let meta = store.term_meta(source_term)?;

    for (key, values) in &meta {
        if skip_keys.contains(key) {
            debug!(%key, count = values.len(), "skipping term meta");
            stats.meta_values_skipped += values.len() as u64;
        } else {
            for value in values {
                debug!(%key, %value, "inserting term meta");
                store.add_term_meta(target_term, key, value)?;
                stats.meta_values += 1;
            }
        }
        stats.meta_groups += 1;
    }

    Ok(())
}
