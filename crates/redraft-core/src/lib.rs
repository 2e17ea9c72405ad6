//! Redraft Core - Differential Analysis & Caching Engine
//!
//! Decides how much of a document to re-analyze after each edit and keeps
//! the suggestion set consistent with the live text:
//! - Records paragraph changes in a persistent ledger
//! - Chooses full, differential or no-op analysis per request
//! - Sends only a context window around changed paragraphs when it can
//! - Caches engine results by content, scope and writing configuration
//! - Merges fresh suggestions with still-valid ones and drops stale ones
//! - Suppresses repeat rewrites of regions the user already accepted
//!
//! # Example
//!
//! ```rust,ignore
//! use redraft_core::prelude::*;
//! use redraft_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example(engine: Arc<dyn AnalysisEngine>) -> Result<(), AnalysisError> {
//! let orchestrator =
//!     AnalysisOrchestrator::new(engine, Arc::new(MemoryStore::new()), EngineConfig::new());
//!
//! let request = AnalysisRequest::new("doc-1", "user-1", "First paragraph.\n\nSecond.");
//! let outcome = orchestrator.request_analysis(request).await?;
//!
//! println!("{} suggestions ({:?})", outcome.suggestions.len(), outcome.decision);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod book;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod orchestrator;
pub mod policy;
pub mod session;
pub mod tracker;
pub mod types;

// Re-exports for convenience
pub use book::{SuggestionBook, SuggestionEvent, SuggestionSet, SuggestionSubscription};
pub use cache::{AnalysisCache, AnalysisPayload, CacheEntry, CacheMetadata, ContextKind};
pub use config::{
    CacheConfig, DecisionConfig, EngineConfig, IterationPolicy, LedgerConfig, SessionConfig,
};
pub use engine::{AnalysisEngine, EngineRequest, EngineResponse, EngineScope};
pub use error::{AnalysisError, AnalysisResult, ConfigError, EngineError};
pub use ledger::{ChangeLedger, ChangeRecord, ChangeRecordId};
pub use orchestrator::{AnalysisOrchestrator, MaintenanceReport};
pub use policy::{Decision, DecisionInput, DecisionPolicy, FullReason, Verdict};
pub use session::{DocumentSession, SessionRegistry};
pub use tracker::{ModificationTracker, ModifiedArea, TrackedKind};
pub use types::{
    AnalysisId, AnalysisMode, AnalysisOutcome, AnalysisRequest, DocumentKey, ParagraphTag,
    Severity, Suggestion, SuggestionId, SuggestionStatus, SuggestionType, WritingConfig,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Redraft Core
    pub use crate::{
        AnalysisEngine, AnalysisError, AnalysisOrchestrator, AnalysisOutcome, AnalysisRequest,
        Decision, DocumentKey, EngineConfig, EngineError, EngineRequest, EngineResponse,
        EngineScope, Suggestion, SuggestionEvent, SuggestionId, SuggestionType, WritingConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
