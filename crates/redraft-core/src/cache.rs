//! Persistent analysis cache
//!
//! Results are keyed by `(user, content hash)` where the hash covers the
//! analyzed text, its scope and the writing configuration. Entries live in
//! the document store so they survive restarts and are shared between
//! orchestrator instances; TTL and access stats run off the injected clock.
//!
//! The cache is an optimization only. No error ever leaves this module:
//! read failures are misses and write failures are dropped with a warning.

use crate::config::CacheConfig;
use crate::types::{AnalysisId, Suggestion};
use chrono::{DateTime, Utc};
use redraft_store::{Collection, Direction, DocumentStore, Query, Record, SharedClock};
use redraft_text::ContentHash;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::Arc;
use tracing::{debug, warn};

/// Scope the cached analysis was run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Whole document
    Full,
    /// Context window
    Differential,
}

/// Descriptive data stored beside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Scope of the analysis
    pub context_kind: ContextKind,
    /// Estimated tokens sent
    pub token_count: usize,
    /// Paragraphs in the analyzed document
    pub paragraph_count: usize,
}

/// Cached engine answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Suggestions as the engine returned them
    pub suggestions: Vec<Suggestion>,
    /// Engine analysis id
    pub analysis_id: AnalysisId,
    /// Engine time
    pub processing_time_ms: u64,
}

/// One cache entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `{user_id}_{content_hash}`
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Key hash
    pub content_hash: ContentHash,
    /// Cached result
    pub payload: AnalysisPayload,
    /// Descriptive data
    pub metadata: CacheMetadata,
    /// Write time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Last hit
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed_at: DateTime<Utc>,
    /// Number of hits
    pub access_count: u64,
    /// Expiry time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry id for a user and hash
    #[must_use]
    pub fn key_for(user_id: &str, hash: &ContentHash) -> String {
        format!("{user_id}_{hash}")
    }

    /// Whether the entry has expired at `now`
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl Record for CacheEntry {
    const COLLECTION: &'static str = "analysis_cache";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.id != Self::key_for(&self.user_id, &self.content_hash) {
            return Err("id does not match user_id and content_hash".into());
        }
        if self.expires_at < self.created_at {
            return Err("expires_at precedes created_at".into());
        }
        Ok(())
    }
}

/// Store-backed analysis cache
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    entries: Collection<CacheEntry>,
    clock: SharedClock,
    config: CacheConfig,
}

impl AnalysisCache {
    /// Create cache over `store`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: SharedClock, config: CacheConfig) -> Self {
        Self {
            entries: Collection::new(store),
            clock,
            config,
        }
    }

    /// Look up a live entry, bumping its access stats
    pub async fn get(&self, user_id: &str, hash: &ContentHash) -> Option<AnalysisPayload> {
        let id = CacheEntry::key_for(user_id, hash);
        let entry = match self.entries.get(&id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache_key = %hash.short(), error = %e, "cache read failed");
                return None;
            }
        };

        let now = self.clock.now();
        if entry.is_expired(now) {
            debug!(cache_key = %hash.short(), "cache entry expired");
            if let Err(e) = self.entries.delete(&id).await {
                warn!(cache_key = %hash.short(), error = %e, "failed to delete expired entry");
            }
            return None;
        }

        let mut fields = Map::new();
        fields.insert("last_accessed_at".into(), json!(now.timestamp_millis()));
        fields.insert("access_count".into(), json!(entry.access_count + 1));
        if let Err(e) = self.entries.update(&id, fields).await {
            warn!(cache_key = %hash.short(), error = %e, "failed to update cache stats");
        }

        debug!(cache_key = %hash.short(), hits = entry.access_count + 1, "cache hit");
        Some(entry.payload)
    }

    /// Read an entry without touching its stats
    pub async fn peek(&self, user_id: &str, hash: &ContentHash) -> Option<CacheEntry> {
        self.entries
            .get(&CacheEntry::key_for(user_id, hash))
            .await
            .ok()
            .flatten()
    }

    /// Store a result, then enforce the per-user ceiling
    pub async fn set(
        &self,
        user_id: &str,
        hash: ContentHash,
        payload: AnalysisPayload,
        metadata: CacheMetadata,
    ) {
        let now = self.clock.now();
        let entry = CacheEntry {
            id: CacheEntry::key_for(user_id, &hash),
            user_id: user_id.to_string(),
            content_hash: hash,
            payload,
            metadata,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            expires_at: now + self.config.ttl(),
        };
        if let Err(e) = self.entries.put(&entry).await {
            warn!(cache_key = %hash.short(), error = %e, "cache write failed");
            return;
        }
        debug!(cache_key = %hash.short(), kind = ?metadata.context_kind, "cached analysis");
        self.evict_excess(user_id).await;
    }

    /// Delete the least recently used entries above the per-user ceiling
    ///
    /// Returns the number of evicted entries.
    pub async fn evict_excess(&self, user_id: &str) -> usize {
        let query = Query::new()
            .filter("user_id", user_id)
            .order_by("last_accessed_at", Direction::Ascending);
        let entries = match self.entries.query(&query).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(user_id, error = %e, "failed to count cache entries");
                return 0;
            }
        };

        let excess = entries
            .len()
            .saturating_sub(self.config.max_entries_per_user);
        if excess == 0 {
            return 0;
        }

        let mut evicted = 0;
        for batch in entries[..excess].chunks(self.config.eviction_batch.max(1)) {
            for entry in batch {
                match self.entries.delete(&entry.id).await {
                    Ok(true) => evicted += 1,
                    Ok(false) => {}
                    Err(e) => warn!(user_id, error = %e, "failed to evict cache entry"),
                }
            }
            debug!(user_id, batch = batch.len(), "evicted cache batch");
        }
        evicted
    }
}
