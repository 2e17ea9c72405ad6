//! Change ledger
//!
//! Persists the paragraph changes detected on each "edit settled" event until
//! an analysis consumes them. Every read and write fails soft: a ledger that
//! cannot be reached looks empty, which makes the orchestrator fall back to a
//! full analysis rather than lose an edit.

use crate::config::LedgerConfig;
use crate::types::{AnalysisId, DocumentKey};
use chrono::{DateTime, Utc};
use redraft_store::{Collection, Direction, DocumentStore, Query, Record, SharedClock, StoreResult};
use redraft_text::ParagraphChange;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::fmt::{self, Display};
use std::sync::Arc;
use tracing::{debug, warn};
use ulid::Ulid;

/// Change record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeRecordId(pub String);

impl ChangeRecordId {
    /// Generate a fresh id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }
}

impl Default for ChangeRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ChangeRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Batch of changes detected for one edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Record id
    pub id: ChangeRecordId,
    /// Document the changes belong to
    pub document_id: String,
    /// Editing user
    pub user_id: String,
    /// Detected changes
    pub changes: Vec<ParagraphChange>,
    /// Consumed by an analysis
    pub analyzed: bool,
    /// Detection time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Analysis that consumed the record
    #[serde(default)]
    pub analysis_id: Option<AnalysisId>,
}

impl Record for ChangeRecord {
    const COLLECTION: &'static str = "change_records";

    fn id(&self) -> String {
        self.id.0.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.document_id.is_empty() || self.user_id.is_empty() {
            return Err("document_id and user_id are required".into());
        }
        let consumed = self.analysis_id.as_ref().is_some_and(|id| !id.is_empty());
        if self.analyzed != consumed {
            return Err("analyzed must be set together with analysis_id".into());
        }
        Ok(())
    }
}

/// Persisted queue of pending changes per document
#[derive(Debug, Clone)]
pub struct ChangeLedger {
    records: Collection<ChangeRecord>,
    clock: SharedClock,
    config: LedgerConfig,
}

impl ChangeLedger {
    /// Create ledger over `store`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: SharedClock, config: LedgerConfig) -> Self {
        Self {
            records: Collection::new(store),
            clock,
            config,
        }
    }

    /// Persist a batch of changes
    ///
    /// Returns `None` if there was nothing to record or the write failed.
    pub async fn record_changes(
        &self,
        key: &DocumentKey,
        changes: Vec<ParagraphChange>,
    ) -> Option<ChangeRecordId> {
        if changes.is_empty() {
            return None;
        }
        let record = ChangeRecord {
            id: ChangeRecordId::new(),
            document_id: key.document_id.clone(),
            user_id: key.user_id.clone(),
            changes,
            analyzed: false,
            created_at: self.clock.now(),
            analysis_id: None,
        };
        match self.records.create(&record).await {
            Ok(()) => {
                debug!(
                    document = %key,
                    record_id = %record.id,
                    changes = record.changes.len(),
                    "recorded changes"
                );
                Some(record.id)
            }
            Err(e) => {
                warn!(document = %key, error = %e, "failed to record changes");
                None
            }
        }
    }

    /// Records not yet consumed, oldest first
    pub async fn get_unanalyzed(&self, key: &DocumentKey) -> Vec<ChangeRecord> {
        let query = Self::document_query(key)
            .filter("analyzed", false)
            .order_by("created_at", Direction::Ascending);
        match self.records.query(&query).await {
            Ok(records) => records,
            Err(e) => {
                warn!(document = %key, error = %e, "failed to load pending changes");
                Vec::new()
            }
        }
    }

    /// Mark records consumed by `analysis_id`
    ///
    /// Records already analyzed keep their original analysis id, and missing
    /// records are skipped. Returns how many records changed state.
    ///
    /// # Errors
    /// Returns `StoreError::Validation` for an empty `analysis_id`, or the
    /// first store failure
    pub async fn mark_analyzed(
        &self,
        ids: &[ChangeRecordId],
        analysis_id: &AnalysisId,
    ) -> StoreResult<usize> {
        if analysis_id.is_empty() {
            return Err(redraft_store::StoreError::validation(
                ChangeRecord::COLLECTION,
                "*",
                "analysis_id is required to mark records analyzed",
            ));
        }

        let mut marked = 0;
        for id in ids {
            let Some(record) = self.records.get(&id.0).await? else {
                debug!(record_id = %id, "change record not visible yet, skipping");
                continue;
            };
            if record.analyzed {
                continue;
            }
            let mut fields = Map::new();
            fields.insert("analyzed".into(), json!(true));
            fields.insert("analysis_id".into(), json!(analysis_id));
            self.records.update(&id.0, fields).await?;
            marked += 1;
        }
        Ok(marked)
    }

    /// Delete records older than the retention window
    pub async fn cleanup(&self, key: &DocumentKey) -> usize {
        let cutoff = self.clock.now() - self.config.retention();
        let records = match self.records.query(&Self::document_query(key)).await {
            Ok(records) => records,
            Err(e) => {
                warn!(document = %key, error = %e, "failed to load change records for cleanup");
                return 0;
            }
        };

        let mut removed = 0;
        for record in records.iter().filter(|r| r.created_at < cutoff) {
            match self.records.delete(&record.id.0).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(record_id = %record.id, error = %e, "failed to delete change record"),
            }
        }
        if removed > 0 {
            debug!(document = %key, removed, "cleaned up change records");
        }
        removed
    }

    fn document_query(key: &DocumentKey) -> Query {
        Query::new()
            .filter("document_id", key.document_id.as_str())
            .filter("user_id", key.user_id.as_str())
    }
}
