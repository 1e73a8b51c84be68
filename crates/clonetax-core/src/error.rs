//! Error types for the taxonomy cloning engine.
//!
//! Every failure here is fatal to the run: preconditions abort before any
//! mutation, mid-run failures abort immediately and leave already-cloned
//! terms in place.

use thiserror::Error;

/// Main error type for the clonetax library.
#[derive(Debug, Error)]
pub enum CloneError {
    // Precondition errors (detected before any mutation)
    #[error("Source taxonomy {0} does not exist")]
    MissingSourceTaxonomy(String),

    #[error("Target taxonomy {0} does not exist")]
    MissingTargetTaxonomy(String),

    #[error("Post type {0} does not exist")]
    MissingPostType(String),

    #[error("Target taxonomy {taxonomy} is not empty ({term_count} existing terms)")]
    TargetTaxonomyNotEmpty { taxonomy: String, term_count: u64 },

    // Mutation errors (detected mid-run)
    #[error("Failed to create term '{name}' in taxonomy {taxonomy}: {message}")]
    TermCreation {
        name: String,
        taxonomy: String,
        message: String,
    },

    #[error("Term {term_id} not found in taxonomy {taxonomy}")]
    TermNotFound { term_id: i64, taxonomy: String },

    // Storage errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl CloneError {
    /// True for failures detected by preflight checks, before any mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CloneError::MissingSourceTaxonomy(_)
                | CloneError::MissingTargetTaxonomy(_)
                | CloneError::MissingPostType(_)
                | CloneError::TargetTaxonomyNotEmpty { .. }
        )
    }
}

/// Result type alias using [`CloneError`].
pub type Result<T> = std::result::Result<T, CloneError>;
