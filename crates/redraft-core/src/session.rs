//! Per-document session state
//!
//! The orchestrator keeps a small amount of mutable state per
//! `(document, user)`: the last text it saw, the text and hash it last
//! analyzed, and the differential streak. Sessions live in a bounded moka
//! cache that drops documents nobody has touched for a while; a dropped
//! session only costs one full analysis.

use crate::config::SessionConfig;
use crate::types::{AnalysisId, DocumentKey};
use moka::future::Cache;
use redraft_text::ContentHash;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mutable state of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSession {
    /// Latest text seen through an edit or a request
    pub last_content: Option<String>,
    /// Text the current suggestion set was computed against
    pub analyzed_content: Option<String>,
    /// Hash of the last analyzed content and config
    pub last_analyzed_hash: Option<ContentHash>,
    /// Analysis the current suggestion set came from
    pub last_analysis_id: Option<AnalysisId>,
    /// Differential runs since the last full run
    pub consecutive_differential: u32,
    /// Successful analyses in this session
    pub analyses: u64,
}

type SessionCell = Arc<Mutex<DocumentSession>>;

/// Bounded, idle-expiring registry of sessions
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Cache<DocumentKey, SessionCell>,
}

impl SessionRegistry {
    /// Create registry
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(config.max_sessions)
                .time_to_idle(config.idle())
                .build(),
        }
    }

    async fn cell(&self, key: &DocumentKey) -> SessionCell {
        self.inner
            .get_with(key.clone(), async { Arc::new(Mutex::new(DocumentSession::default())) })
            .await
    }

    /// Copy of the current state
    pub async fn snapshot(&self, key: &DocumentKey) -> DocumentSession {
        self.cell(key).await.lock().await.clone()
    }

    /// Mutate the state under its lock
    pub async fn update<F, T>(&self, key: &DocumentKey, f: F) -> T
    where
        F: FnOnce(&mut DocumentSession) -> T,
    {
        let cell = self.cell(key).await;
        let mut session = cell.lock().await;
        f(&mut session)
    }

    /// Forget a document
    pub async fn invalidate(&self, key: &DocumentKey) {
        self.inner.invalidate(key).await;
    }

    /// Approximate number of live sessions
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Whether no sessions are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_start_empty_and_persist_updates() {
        let registry = SessionRegistry::default();
        let key = DocumentKey::new("d", "u");
        assert_eq!(registry.snapshot(&key).await, DocumentSession::default());

        let streak = registry
            .update(&key, |s| {
                s.consecutive_differential += 2;
                s.last_content = Some("text".into());
                s.consecutive_differential
            })
            .await;
        assert_eq!(streak, 2);

        let session = registry.snapshot(&key).await;
        assert_eq!(session.last_content.as_deref(), Some("text"));
        assert_eq!(
            registry
                .snapshot(&DocumentKey::new("d", "other"))
                .await
                .consecutive_differential,
            0
        );
    }

    #[tokio::test]
    async fn invalidate_resets_state() {
        let registry = SessionRegistry::default();
        let key = DocumentKey::new("d", "u");
        registry.update(&key, |s| s.analyses = 5).await;
        registry.invalidate(&key).await;
        assert_eq!(registry.snapshot(&key).await.analyses, 0);
    }
}
