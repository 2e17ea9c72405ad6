//! Modification and iteration tracking
//!
//! When a clarity or engagement rewrite is accepted, the span it touched
//! becomes a [`ModifiedArea`]. Fresh suggestions of the same type that land
//! on that span are suppressed while the area is cooling down or has been
//! rewritten often enough, which stops the engine from endlessly
//! re-polishing the same sentence.

use crate::config::IterationPolicy;
use crate::types::{DocumentKey, Suggestion, SuggestionId, SuggestionType};
use chrono::{DateTime, Utc};
use redraft_store::{Collection, Direction, DocumentStore, Query, Record, SharedClock, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::Arc;
use tracing::{debug, warn};
use ulid::Ulid;

/// Suggestion types whose acceptances are tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedKind {
    /// Clarity rewrite
    Clarity,
    /// Engagement rewrite
    Engagement,
}

impl TryFrom<SuggestionType> for TrackedKind {
    type Error = SuggestionType;

    fn try_from(kind: SuggestionType) -> Result<Self, Self::Error> {
        match kind {
            SuggestionType::Clarity => Ok(Self::Clarity),
            SuggestionType::Engagement => Ok(Self::Engagement),
            other => Err(other),
        }
    }
}

impl From<TrackedKind> for SuggestionType {
    fn from(kind: TrackedKind) -> Self {
        match kind {
            TrackedKind::Clarity => Self::Clarity,
            TrackedKind::Engagement => Self::Engagement,
        }
    }
}

/// Span rewritten by accepted suggestions of one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedArea {
    /// Area id
    pub id: String,
    /// Owning document
    pub document_id: String,
    /// Owning user
    pub user_id: String,
    /// Span start
    pub start_offset: usize,
    /// Span end
    pub end_offset: usize,
    /// Rewrite type
    #[serde(rename = "type")]
    pub kind: TrackedKind,
    /// Text before the first rewrite
    pub original_text: String,
    /// Text after the latest rewrite
    pub modified_text: String,
    /// Accepted rewrites of this span
    pub iteration_count: u32,
    /// Latest rewrite
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
    /// Suggestions that rewrote the span
    pub suggestion_ids: Vec<SuggestionId>,
}

impl ModifiedArea {
    /// Whether `[start, end)` intersects this area
    ///
    /// Empty spans count as touching the byte at `start`.
    #[must_use]
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        let end = end.max(start + 1);
        let area_end = self.end_offset.max(self.start_offset + 1);
        start < area_end && self.start_offset < end
    }
}

impl Record for ModifiedArea {
    const COLLECTION: &'static str = "modified_areas";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.document_id.is_empty() || self.user_id.is_empty() {
            return Err("document_id and user_id are required".into());
        }
        if self.end_offset < self.start_offset {
            return Err("end_offset precedes start_offset".into());
        }
        Ok(())
    }
}

/// Tracks rewritten spans and suppresses repeat suggestions
#[derive(Debug, Clone)]
pub struct ModificationTracker {
    areas: Collection<ModifiedArea>,
    clock: SharedClock,
    policy: IterationPolicy,
}

impl ModificationTracker {
    /// Create tracker over `store`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: SharedClock, policy: IterationPolicy) -> Self {
        Self {
            areas: Collection::new(store),
            clock,
            policy,
        }
    }

    /// Active policy
    #[must_use]
    pub fn policy(&self) -> &IterationPolicy {
        &self.policy
    }

    /// Areas of a document ordered by start offset; empty on failure
    pub async fn areas_for(&self, key: &DocumentKey) -> Vec<ModifiedArea> {
        let query = Query::new()
            .filter("document_id", key.document_id.as_str())
            .filter("user_id", key.user_id.as_str())
            .order_by("start_offset", Direction::Ascending);
        match self.areas.query(&query).await {
            Ok(areas) => areas,
            Err(e) => {
                warn!(document = %key, error = %e, "failed to load modified areas");
                Vec::new()
            }
        }
    }

    /// Record an accepted suggestion
    ///
    /// Returns the created or extended area, or `None` for types that are not
    /// tracked.
    ///
    /// # Errors
    /// Returns the store error if the area could not be written
    pub async fn record_acceptance(
        &self,
        suggestion: &Suggestion,
        applied_text: &str,
    ) -> StoreResult<Option<ModifiedArea>> {
        let Ok(kind) = TrackedKind::try_from(suggestion.kind) else {
            return Ok(None);
        };
        let key = suggestion.key();
        let now = self.clock.now();
        let applied_end = suggestion.start_offset + applied_text.len();

        let existing = self
            .areas_for(&key)
            .await
            .into_iter()
            .find(|a| a.kind == kind && a.overlaps(suggestion.start_offset, suggestion.end_offset));

        let area = match existing {
            Some(mut area) => {
                area.start_offset = area.start_offset.min(suggestion.start_offset);
                area.end_offset = area.end_offset.max(applied_end);
                area.modified_text = applied_text.to_string();
                area.iteration_count += 1;
                area.last_modified = now;
                area.suggestion_ids.push(suggestion.id.clone());
                area
            }
            None => ModifiedArea {
                id: Ulid::new().to_string(),
                document_id: key.document_id.clone(),
                user_id: key.user_id.clone(),
                start_offset: suggestion.start_offset,
                end_offset: applied_end,
                kind,
                original_text: suggestion.original_text.clone(),
                modified_text: applied_text.to_string(),
                iteration_count: 1,
                last_modified: now,
                suggestion_ids: vec![suggestion.id.clone()],
            },
        };

        self.areas.put(&area).await?;
        debug!(
            document = %key,
            area_id = %area.id,
            kind = ?area.kind,
            iterations = area.iteration_count,
            "recorded modified area"
        );
        Ok(Some(area))
    }

    /// Whether `candidate` falls on an area that is saturated or cooling down
    #[must_use]
    pub fn is_suppressed(
        &self,
        areas: &[ModifiedArea],
        candidate: &Suggestion,
        now: DateTime<Utc>,
    ) -> bool {
        let (max_iterations, cooldown) = self.policy.limits_for(candidate.kind);
        areas.iter().any(|area| {
            SuggestionType::from(area.kind) == candidate.kind
                && area.overlaps(candidate.start_offset, candidate.end_offset)
                && (area.iteration_count >= max_iterations || now - area.last_modified < cooldown)
        })
    }

    /// Drop suppressed candidates
    #[must_use]
    pub fn filter_suppressed(
        &self,
        areas: &[ModifiedArea],
        candidates: Vec<Suggestion>,
    ) -> Vec<Suggestion> {
        if areas.is_empty() {
            return candidates;
        }
        let now = self.clock.now();
        let before = candidates.len();
        let kept: Vec<_> = candidates
            .into_iter()
            .filter(|s| !self.is_suppressed(areas, s, now))
            .collect();
        if kept.len() < before {
            debug!(suppressed = before - kept.len(), "suppressed repeat suggestions");
        }
        kept
    }

    /// Reset iteration counts of areas untouched for the retention period
    ///
    /// Areas are kept so their original text stays available to the engine.
    pub async fn purge_stale(&self, key: &DocumentKey) -> usize {
        let cutoff = self.clock.now() - self.policy.area_retention();
        let mut reset = 0;
        for area in self.areas_for(key).await {
            if area.last_modified >= cutoff || area.iteration_count == 0 {
                continue;
            }
            let mut fields = Map::new();
            fields.insert("iteration_count".into(), json!(0));
            match self.areas.update(&area.id, fields).await {
                Ok(()) => reset += 1,
                Err(e) => warn!(area_id = %area.id, error = %e, "failed to reset modified area"),
            }
        }
        if reset > 0 {
            debug!(document = %key, reset, "reset stale modified areas");
        }
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use redraft_store::{Clock, ManualClock, MemoryStore};

    fn tracker() -> (ModificationTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::epoch());
        let tracker = ModificationTracker::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            IterationPolicy::default(),
        );
        (tracker, clock)
    }

    fn key() -> DocumentKey {
        DocumentKey::new("d", "u")
    }

    fn suggestion(kind: SuggestionType, original: &str, start: usize) -> Suggestion {
        Suggestion::new(kind, original, "rewritten", start).for_document(&key())
    }

    fn area(kind: TrackedKind, start: usize, end: usize, iterations: u32, at: DateTime<Utc>) -> ModifiedArea {
        ModifiedArea {
            id: "a".into(),
            document_id: "d".into(),
            user_id: "u".into(),
            start_offset: start,
            end_offset: end,
            kind,
            original_text: String::new(),
            modified_text: String::new(),
            iteration_count: iterations,
            last_modified: at,
            suggestion_ids: Vec::new(),
        }
    }

    #[test]
    fn overlap_is_half_open() {
        let a = area(TrackedKind::Clarity, 10, 20, 1, Utc::now());
        assert!(a.overlaps(15, 25));
        assert!(a.overlaps(5, 11));
        assert!(!a.overlaps(20, 30));
        assert!(!a.overlaps(0, 10));
        assert!(a.overlaps(12, 12));
    }

    #[test]
    fn only_same_type_is_suppressed() {
        let (tracker, clock) = tracker();
        let areas = vec![area(TrackedKind::Clarity, 10, 20, 1, clock.now())];
        let clarity = suggestion(SuggestionType::Clarity, "abcde", 12);
        let grammar = suggestion(SuggestionType::Grammar, "abcde", 12);
        let elsewhere = suggestion(SuggestionType::Clarity, "abcde", 40);

        assert!(tracker.is_suppressed(&areas, &clarity, clock.now()));
        assert!(!tracker.is_suppressed(&areas, &grammar, clock.now()));
        assert!(!tracker.is_suppressed(&areas, &elsewhere, clock.now()));
    }

    #[test]
    fn saturated_area_stays_suppressed_after_cooldown() {
        let (tracker, clock) = tracker();
        let areas = vec![area(TrackedKind::Engagement, 0, 10, 1, clock.now())];
        let candidate = suggestion(SuggestionType::Engagement, "abc", 2);
        clock.advance(Duration::hours(1));
        assert!(tracker.is_suppressed(&areas, &candidate, clock.now()));
    }

    #[test]
    fn unsaturated_area_suppresses_only_during_cooldown() {
        let policy = IterationPolicy {
            focus_max_iterations: 3,
            ..IterationPolicy::default()
        };
        let clock = Arc::new(ManualClock::epoch());
        let tracker = ModificationTracker::new(Arc::new(MemoryStore::new()), clock.clone(), policy);
        let areas = vec![area(TrackedKind::Clarity, 0, 10, 1, clock.now())];
        let candidate = suggestion(SuggestionType::Clarity, "abc", 2);

        clock.advance(Duration::minutes(2));
        assert!(tracker.is_suppressed(&areas, &candidate, clock.now()));
        clock.advance(Duration::minutes(2));
        assert!(!tracker.is_suppressed(&areas, &candidate, clock.now()));
    }

    #[tokio::test]
    async fn acceptance_creates_then_extends_area() {
        let (tracker, clock) = tracker();
        let first = suggestion(SuggestionType::Clarity, "a long phrase", 10);
        let created = tracker
            .record_acceptance(&first, "short")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.iteration_count, 1);
        assert_eq!((created.start_offset, created.end_offset), (10, 15));

        clock.advance(Duration::minutes(1));
        let second = suggestion(SuggestionType::Clarity, "short", 10);
        let extended = tracker
            .record_acceptance(&second, "a much longer phrase")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extended.id, created.id);
        assert_eq!(extended.iteration_count, 2);
        assert_eq!(extended.end_offset, 10 + "a much longer phrase".len());
        assert_eq!(extended.suggestion_ids.len(), 2);
        assert_eq!(tracker.areas_for(&key()).await.len(), 1);
    }

    #[tokio::test]
    async fn untracked_types_are_ignored() {
        let (tracker, _) = tracker();
        let grammar = suggestion(SuggestionType::Grammar, "is", 0);
        assert!(tracker
            .record_acceptance(&grammar, "are")
            .await
            .unwrap()
            .is_none());
        assert!(tracker.areas_for(&key()).await.is_empty());
    }

    #[tokio::test]
    async fn purge_resets_old_areas() {
        let (tracker, clock) = tracker();
        tracker
            .record_acceptance(&suggestion(SuggestionType::Clarity, "x", 0), "y")
            .await
            .unwrap();
        clock.advance(Duration::days(29));
        assert_eq!(tracker.purge_stale(&key()).await, 0);
        clock.advance(Duration::days(2));
        assert_eq!(tracker.purge_stale(&key()).await, 1);

        let areas = tracker.areas_for(&key()).await;
        assert_eq!(areas[0].iteration_count, 0);
        assert!(!tracker.is_suppressed(
            &areas,
            &suggestion(SuggestionType::Clarity, "y", 0),
            clock.now()
        ));
    }
}
