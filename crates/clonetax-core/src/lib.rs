//! Clonetax core - taxonomy cloning over a content store.
//!
//! Clones an entire taxonomy - terms, term meta and post relationships -
//! from a source taxonomy into an empty target taxonomy, preserving the
//! hierarchy and the many-to-many post links. The engine only talks to the
//! content store through the [`ContentStore`] trait, so it runs unchanged
//! against the SQLite backend or the in-memory store.
//!
//! # Example
//!
//! ```rust
//! use clonetax_core::{CloneRequest, ContentStore, MemoryStore, NullProgress, TaxonomyCloner};
//!
//! fn main() -> clonetax_core::Result<()> {
//!     let store = MemoryStore::new();
//!     store.register_taxonomy("category")?;
//!     store.register_taxonomy("category_v2")?;
//!     store.register_post_type("post")?;
//!     store.create_term("category", "Fruit", "fruit", "", 0)?;
//!
//!     let request = CloneRequest::new("category", "category_v2");
//!     let stats = TaxonomyCloner::new(&store).run(&request, &mut NullProgress)?;
//!     assert_eq!(stats.terms, 1);
//!     Ok(())
//! }
//! ```

pub mod clone;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use clone::{CloneRequest, NullProgress, ProgressSink, TaxonomyCloner};
pub use error::{CloneError, Result};
pub use store::{ContentStore, MemoryStore, SqliteStore};
pub use types::{sanitize_meta_key, CloneStats, CreatedTerm, Term};
