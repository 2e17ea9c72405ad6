//! Error types for the document store

/// Errors surfaced by a [`DocumentStore`](crate::DocumentStore)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Record already exists (create only)
    #[error("record already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    /// Record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record failed validation at the store boundary
    #[error("invalid record {collection}/{id}: {reason}")]
    Validation {
        collection: String,
        id: String,
        reason: String,
    },

    /// Backend unreachable or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create not-found error
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create validation error
    pub fn validation(
        collection: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            collection: collection.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry could succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
