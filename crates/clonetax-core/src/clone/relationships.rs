//! Post relationship duplication.

use tracing::debug;

use crate::error::Result;
use crate::store::ContentStore;
use crate::types::CloneStats;

/// Attach the target term to every post directly associated with the source
/// term.
///
/// Only direct associations count; posts linked through descendant terms
/// are left to those terms' own passes. The attach is additive, so existing
/// relationships on a post, in the target taxonomy or any other, survive.
pub(super) fn clone_term_relationships(
    store: &dyn ContentStore,
    post_type: &str,
    source_taxonomy: &str,
    target_taxonomy: &str,
    source_term: i64,
    target_term: i64,
    stats: &mut CloneStats,
) -> Result<()> {
    let posts = store.posts_for_term(post_type, source_taxonomy, source_term)?;

    for post_id in posts {
        debug!(post_id, target_term, "adding term to post");
        store.append_post_terms(post_id, &[target_term], target_taxonomy)?;
        stats.relationships += 1;
    }

    Ok(())
}
