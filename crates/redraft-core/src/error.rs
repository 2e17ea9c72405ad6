//! Error types for Redraft Core
//!
//! Provides error handling for:
//! - External analysis engine failures
//! - Store failures that cannot be degraded
//! - Suggestion lifecycle misuse (unknown, stale, already resolved)
//! - Configuration loading

use crate::types::{SuggestionId, SuggestionStatus};
use redraft_store::StoreError;
use redraft_text::HashError;

/// Main analysis error type
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// External analysis engine failed
    #[error("analysis engine failed: {0}")]
    Engine(#[from] EngineError),

    /// Store failed where no fallback exists
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Suggestion id is unknown
    #[error("suggestion not found: {0}")]
    SuggestionNotFound(SuggestionId),

    /// Suggestion text no longer exists in the document
    #[error("suggestion is stale: {0}")]
    StaleSuggestion(SuggestionId),

    /// Suggestion was already accepted or rejected
    #[error("suggestion {id} already {status:?}")]
    AlreadyResolved {
        id: SuggestionId,
        status: SuggestionStatus,
    },

    /// Request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Cache key could not be computed
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Check if the caller should offer "try again"
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_retryable(),
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Failures reported by an [`AnalysisEngine`](crate::engine::AnalysisEngine)
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Engine could not be reached
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Engine refused the request (quota, malformed input)
    #[error("engine rejected request: {0}")]
    Rejected(String),

    /// Engine did not answer in time
    #[error("engine timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

impl EngineError {
    /// Check if a retry could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display() {
        let err = EngineError::Timeout { after_ms: 1500 };
        assert_eq!(err.to_string(), "engine timed out after 1500ms");
    }

    #[test]
    fn retryable_classification() {
        assert!(AnalysisError::Engine(EngineError::Unavailable("down".into())).is_retryable());
        assert!(!AnalysisError::Engine(EngineError::Rejected("quota".into())).is_retryable());
        assert!(AnalysisError::Store(StoreError::Unavailable("io".into())).is_retryable());
        assert!(!AnalysisError::InvalidRequest("empty".into()).is_retryable());
    }

    #[test]
    fn error_conversions() {
        let err: AnalysisError = EngineError::Rejected("bad".into()).into();
        assert!(matches!(err, AnalysisError::Engine(_)));
    }
}
