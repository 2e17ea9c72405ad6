//! Analysis orchestrator
//!
//! The public face of the engine. Owns every component and runs the
//! per-request workflow: record the edit, decide the scope, consult the
//! cache, call the external engine, merge, persist and notify.

use crate::book::{SuggestionBook, SuggestionEvent, SuggestionSet, SuggestionSubscription};
use crate::cache::{AnalysisCache, AnalysisPayload, CacheMetadata, ContextKind};
use crate::config::EngineConfig;
use crate::engine::{AnalysisEngine, EngineRequest, EngineScope};
use crate::error::{AnalysisError, AnalysisResult};
use crate::ledger::{ChangeLedger, ChangeRecordId};
use crate::merge::{self, Rebase};
use crate::policy::{Decision, DecisionInput, DecisionPolicy, FullReason};
use crate::session::{DocumentSession, SessionRegistry};
use crate::tracker::{ModificationTracker, ModifiedArea};
use crate::types::{
    AnalysisId, AnalysisMode, AnalysisOutcome, AnalysisRequest, DocumentKey, Suggestion,
    SuggestionId, SuggestionStatus,
};
use redraft_store::{DocumentStore, SharedClock, SystemClock};
use redraft_text::{
    changed_indices, detect_changes, estimate_tokens, paragraph_at, segment, ContextWindowBuilder,
    Paragraph,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Expired change records deleted
    pub ledger_records_removed: usize,
    /// Modified areas whose iteration count was reset
    pub areas_reset: usize,
}

/// Differential analysis orchestrator
#[derive(Debug)]
pub struct AnalysisOrchestrator {
    /// Configuration
    config: EngineConfig,
    /// External analysis backend
    engine: Arc<dyn AnalysisEngine>,
    /// Pending paragraph changes
    ledger: ChangeLedger,
    /// Cached engine results
    cache: AnalysisCache,
    /// Rewritten spans
    tracker: ModificationTracker,
    /// Suggestion sets and subscriptions
    book: SuggestionBook,
    /// Per-document state
    sessions: SessionRegistry,
    /// Scope decision
    policy: DecisionPolicy,
    /// Context window sizing
    windows: ContextWindowBuilder,
    /// Time source
    clock: SharedClock,
}

impl AnalysisOrchestrator {
    /// Create orchestrator on the wall clock
    #[must_use]
    pub fn new(
        engine: Arc<dyn AnalysisEngine>,
        store: Arc<dyn DocumentStore>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(engine, store, config, Arc::new(SystemClock))
    }

    /// Create orchestrator on an explicit clock
    #[must_use]
    pub fn with_clock(
        engine: Arc<dyn AnalysisEngine>,
        store: Arc<dyn DocumentStore>,
        config: EngineConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            engine,
            ledger: ChangeLedger::new(Arc::clone(&store), Arc::clone(&clock), config.ledger),
            cache: AnalysisCache::new(Arc::clone(&store), Arc::clone(&clock), config.cache),
            tracker: ModificationTracker::new(Arc::clone(&store), Arc::clone(&clock), config.iteration),
            book: SuggestionBook::new(store),
            sessions: SessionRegistry::new(&config.session),
            policy: DecisionPolicy::new(config.decision),
            windows: ContextWindowBuilder::new(config.window),
            clock,
            config,
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change ledger
    #[must_use]
    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    /// Analysis cache
    #[must_use]
    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Modification tracker
    #[must_use]
    pub fn tracker(&self) -> &ModificationTracker {
        &self.tracker
    }

    /// Suggestion book
    #[must_use]
    pub fn book(&self) -> &SuggestionBook {
        &self.book
    }

    /// Session state of a document
    pub async fn session(&self, key: &DocumentKey) -> DocumentSession {
        self.sessions.snapshot(key).await
    }

    /// Record a settled edit
    ///
    /// Call this when typing pauses. Returns the ledger record id when any
    /// paragraph changed and the ledger accepted the write.
    pub async fn record_edit(
        &self,
        key: &DocumentKey,
        previous: &str,
        current: &str,
    ) -> Option<ChangeRecordId> {
        let changes = detect_changes(&segment(previous), &segment(current), self.clock.now());
        self.sessions
            .update(key, |s| s.last_content = Some(current.to_string()))
            .await;
        self.ledger.record_changes(key, changes).await
    }

    /// Analyze a document
    ///
    /// # Workflow
    /// 1. Record any edit since the last text seen for the document
    /// 2. Load pending changes and decide full, differential or no-op
    /// 3. Analyze (cache first), retrying a failed differential run in full
    /// 4. Merge, drop stale suggestions, persist the set
    /// 5. Mark consumed changes analyzed and notify subscribers
    ///
    /// # Errors
    /// Returns `AnalysisError::Engine` when the engine fails, after the
    /// full-analysis retry for differential runs
    pub async fn request_analysis(
        &self,
        request: AnalysisRequest,
    ) -> AnalysisResult<AnalysisOutcome> {
        if request.user_id.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest("user_id is required".into()));
        }

        let key = request.key();
        let unsaved = request.is_unsaved();
        let session = if unsaved {
            DocumentSession::default()
        } else {
            self.sessions.snapshot(&key).await
        };
        let paragraphs = segment(&request.content);

        if !unsaved {
            let baseline = session
                .last_content
                .as_deref()
                .or(request.previous_content.as_deref());
            if let Some(previous) = baseline.filter(|p| *p != request.content) {
                let changes = detect_changes(&segment(previous), &paragraphs, self.clock.now());
                self.ledger.record_changes(&key, changes).await;
            }
        }

        let pending = if unsaved {
            Vec::new()
        } else {
            self.ledger.get_unanalyzed(&key).await
        };
        let changed = changed_indices(pending.iter().flat_map(|r| r.changes.iter()));
        let content_hash = EngineScope::Full {
            content: request.content.clone(),
        }
        .cache_key(&request.writing_config)?;

        let verdict = self.policy.decide(&DecisionInput {
            new_document: unsaved,
            requested_full: request.mode == AnalysisMode::Full,
            has_pending_changes: !pending.is_empty(),
            changed: changed.clone(),
            total_paragraphs: paragraphs.len(),
            content_unchanged: session.last_analyzed_hash == Some(content_hash),
            consecutive_differential: session.consecutive_differential,
        });
        debug!(
            document = %key,
            decision = ?verdict.decision,
            pending = pending.len(),
            changed = changed.len(),
            ratio = verdict.change_ratio,
            "analysis decision"
        );

        let areas = if unsaved {
            Vec::new()
        } else {
            self.tracker.areas_for(&key).await
        };

        let result = match verdict.decision {
            Decision::NoOp => self.current_set(&request, &session).await,
            Decision::Full(reason) => self.run_full(&request, &paragraphs, &areas, reason).await,
            Decision::Differential => {
                match self
                    .run_differential(&request, &session, &paragraphs, &changed, &areas)
                    .await
                {
                    Ok(outcome) => Ok(outcome),
                    Err(e) => {
                        warn!(document = %key, error = %e, "differential analysis failed, retrying in full");
                        self.run_full(&request, &paragraphs, &areas, FullReason::DifferentialFailed)
                            .await
                    }
                }
            }
        };

        let mut outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(document = %key, error = %e, "analysis failed");
                if !unsaved {
                    self.book.publish(&key, SuggestionEvent::Failed(e.to_string()));
                }
                return Err(e);
            }
        };

        if unsaved {
            info!(user_id = %key.user_id, suggestions = outcome.suggestions.len(), "analyzed unsaved document");
            return Ok(outcome);
        }

        // A newer edit may have landed while the engine was busy.
        let latest = self.sessions.snapshot(&key).await.last_content;
        let newer_edit = latest.as_ref().filter(|l| {
            **l != request.content && Some(*l) != session.last_content.as_ref()
        });
        if let Some(latest) = newer_edit {
            outcome.suggestions = merge::revalidate(outcome.suggestions, latest);
        }
        let newer_edit = newer_edit.is_some();

        if let Err(e) = self.book.replace_pending(&key, &outcome.suggestions).await {
            warn!(document = %key, error = %e, "failed to persist suggestions");
        }

        if !pending.is_empty() {
            let ids: Vec<_> = pending.iter().map(|r| r.id.clone()).collect();
            match self.ledger.mark_analyzed(&ids, &outcome.analysis_id).await {
                Ok(marked) => debug!(document = %key, marked, "marked changes analyzed"),
                Err(e) => warn!(document = %key, error = %e, "failed to mark changes analyzed"),
            }
        }

        let streak = match outcome.decision {
            Decision::Differential => verdict.consecutive_differential,
            Decision::NoOp => session.consecutive_differential,
            Decision::Full(_) => 0,
        };
        self.sessions
            .update(&key, |s| {
                if !newer_edit {
                    s.last_content = Some(request.content.clone());
                }
                s.analyzed_content = Some(request.content.clone());
                s.last_analyzed_hash = Some(content_hash);
                s.last_analysis_id = Some(outcome.analysis_id.clone());
                s.consecutive_differential = streak;
                s.analyses += 1;
            })
            .await;

        if outcome.decision != Decision::NoOp {
            self.publish_set(&key, &outcome);
        }

        info!(
            document = %key,
            decision = ?outcome.decision,
            suggestions = outcome.suggestions.len(),
            from_cache = outcome.from_cache,
            saved_tokens = outcome.token_savings.map_or(0, |s| s.saved_tokens),
            "analysis complete"
        );
        Ok(outcome)
    }

    /// Accept a suggestion the user applied
    ///
    /// If the suggestion no longer points at its text, the last known content
    /// is searched for it; when it cannot be found the suggestion is removed.
    ///
    /// # Errors
    /// `SuggestionNotFound`, `AlreadyResolved`, `StaleSuggestion`, or a store error
    pub async fn accept_suggestion(
        &self,
        id: &SuggestionId,
        applied_text: &str,
    ) -> AnalysisResult<Suggestion> {
        let mut suggestion = self.resolve_pending(id).await?;
        let key = suggestion.key();

        let session = self.sessions.snapshot(&key).await;
        let known = session
            .last_content
            .as_deref()
            .or(session.analyzed_content.as_deref());
        if known.is_none() {
            debug!(suggestion_id = %id, "no known content for document, accepting without anchor check");
        }
        if let Some(content) = known {
            if !suggestion.anchors_in(content) {
                let Some(start) = merge::relocate(&suggestion, content) else {
                    debug!(suggestion_id = %id, "suggestion text is gone");
                    if let Err(e) = self.book.delete(id).await {
                        warn!(suggestion_id = %id, error = %e, "failed to delete stale suggestion");
                    }
                    self.publish_current(&key).await;
                    return Err(AnalysisError::StaleSuggestion(id.clone()));
                };
                debug!(suggestion_id = %id, from = suggestion.start_offset, to = start, "relocated suggestion");
                suggestion.move_to(start);
            }
        }

        suggestion.status = SuggestionStatus::Accepted;
        suggestion.updated_at = self.clock.now();
        self.book.save(&suggestion).await?;

        if let Err(e) = self.tracker.record_acceptance(&suggestion, applied_text).await {
            warn!(suggestion_id = %id, error = %e, "failed to track modified area");
        }

        info!(document = %key, suggestion_id = %id, kind = %suggestion.kind, "suggestion accepted");
        self.publish_current(&key).await;
        Ok(suggestion)
    }

    /// Dismiss a suggestion
    ///
    /// # Errors
    /// `SuggestionNotFound`, `AlreadyResolved`, or a store error
    pub async fn reject_suggestion(&self, id: &SuggestionId) -> AnalysisResult<Suggestion> {
        let mut suggestion = self.resolve_pending(id).await?;
        suggestion.status = SuggestionStatus::Rejected;
        suggestion.updated_at = self.clock.now();
        self.book.save(&suggestion).await?;

        let key = suggestion.key();
        debug!(document = %key, suggestion_id = %id, "suggestion rejected");
        self.publish_current(&key).await;
        Ok(suggestion)
    }

    /// Remove a suggestion entirely
    ///
    /// # Errors
    /// `SuggestionNotFound` or a store error
    pub async fn delete_suggestion(&self, id: &SuggestionId) -> AnalysisResult<()> {
        let suggestion = self
            .book
            .get(id)
            .await?
            .ok_or_else(|| AnalysisError::SuggestionNotFound(id.clone()))?;
        self.book.delete(id).await?;

        let key = suggestion.key();
        debug!(document = %key, suggestion_id = %id, "suggestion deleted");
        self.publish_current(&key).await;
        Ok(())
    }

    /// Subscribe to a document's suggestion set
    pub async fn subscribe(&self, key: &DocumentKey) -> SuggestionSubscription {
        let analysis_id = self.sessions.snapshot(key).await.last_analysis_id;
        self.book.subscribe(key, analysis_id).await
    }

    /// Delete expired ledger records and reset stale modified areas
    pub async fn maintenance(&self, key: &DocumentKey) -> MaintenanceReport {
        let report = MaintenanceReport {
            ledger_records_removed: self.ledger.cleanup(key).await,
            areas_reset: self.tracker.purge_stale(key).await,
        };
        debug!(document = %key, ?report, "maintenance complete");
        report
    }

    async fn run_full(
        &self,
        request: &AnalysisRequest,
        paragraphs: &[Paragraph],
        areas: &[ModifiedArea],
        reason: FullReason,
    ) -> AnalysisResult<AnalysisOutcome> {
        let metadata = CacheMetadata {
            context_kind: ContextKind::Full,
            token_count: estimate_tokens(&request.content),
            paragraph_count: paragraphs.len(),
        };
        let scope = EngineScope::Full {
            content: request.content.clone(),
        };
        let (payload, from_cache) = self.analyze(request, scope, metadata, areas).await?;
        let fresh = self.prepare(request, payload.suggestions, areas);

        Ok(AnalysisOutcome {
            suggestions: merge::merge(Vec::new(), fresh, &request.content),
            analysis_id: payload.analysis_id,
            used_differential: false,
            token_savings: None,
            decision: Decision::Full(reason),
            from_cache,
        })
    }

    async fn run_differential(
        &self,
        request: &AnalysisRequest,
        session: &DocumentSession,
        paragraphs: &[Paragraph],
        pending_changed: &BTreeSet<usize>,
        areas: &[ModifiedArea],
    ) -> AnalysisResult<AnalysisOutcome> {
        let key = request.key();
        let existing = self.book.pending(&key).await?;

        // Everything that moved since the current set was computed, plus
        // whatever the ledger says changed.
        let old_paragraphs = session.analyzed_content.as_deref().map(segment);
        let mut changed = pending_changed.clone();
        if let Some(old) = &old_paragraphs {
            changed.extend(changed_indices(&detect_changes(
                old,
                paragraphs,
                self.clock.now(),
            )));
        }

        let carried = Rebase {
            old: old_paragraphs.as_deref(),
            new: paragraphs,
            changed: &changed,
        }
        .carry_over(existing);

        let window = self.windows.build(paragraphs, &changed);
        if window.is_empty() {
            debug!(document = %key, "empty context window, skipping engine");
            return Ok(AnalysisOutcome {
                suggestions: merge::merge(carried, Vec::new(), &request.content),
                analysis_id: session.last_analysis_id.clone().unwrap_or_default(),
                used_differential: true,
                token_savings: Some(window.savings),
                decision: Decision::Differential,
                from_cache: false,
            });
        }

        let metadata = CacheMetadata {
            context_kind: ContextKind::Differential,
            token_count: window.savings.window_tokens,
            paragraph_count: paragraphs.len(),
        };
        let scope = EngineScope::Window {
            entries: window.entries.clone(),
            summary: window.summary.as_ref().map(|s| s.text.clone()),
        };
        let (payload, from_cache) = self.analyze(request, scope, metadata, areas).await?;

        let fresh: Vec<_> = self
            .prepare(request, payload.suggestions, areas)
            .into_iter()
            .filter(|s| paragraph_at(paragraphs, s.start_offset).is_some_and(|i| changed.contains(&i)))
            .collect();

        Ok(AnalysisOutcome {
            suggestions: merge::merge(carried, fresh, &request.content),
            analysis_id: payload.analysis_id,
            used_differential: true,
            token_savings: Some(window.savings),
            decision: Decision::Differential,
            from_cache,
        })
    }

    /// Serve from cache or call the engine, caching successful answers
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        scope: EngineScope,
        metadata: CacheMetadata,
        areas: &[ModifiedArea],
    ) -> AnalysisResult<(AnalysisPayload, bool)> {
        let hash = scope.cache_key(&request.writing_config)?;
        if let Some(payload) = self.cache.get(&request.user_id, &hash).await {
            return Ok((payload, true));
        }

        debug!(
            document_id = %request.document_id,
            scope = scope.label(),
            bytes = scope.text_len(),
            "calling analysis engine"
        );
        let response = self
            .engine
            .analyze(EngineRequest {
                document_id: request.document_id.clone(),
                user_id: request.user_id.clone(),
                scope,
                writing_config: request.writing_config.clone(),
                previously_modified_areas: areas.to_vec(),
                paragraph_tags: request.paragraph_tags.clone(),
            })
            .await?;

        let analysis_id = if response.analysis_id.is_empty() {
            AnalysisId::new()
        } else {
            response.analysis_id
        };
        let payload = AnalysisPayload {
            suggestions: response.suggestions,
            analysis_id,
            processing_time_ms: response.processing_time_ms,
        };
        self.cache
            .set(&request.user_id, hash, payload.clone(), metadata)
            .await;
        Ok((payload, false))
    }

    /// Stamp engine suggestions for this document and drop excluded ones
    fn prepare(
        &self,
        request: &AnalysisRequest,
        suggestions: Vec<Suggestion>,
        areas: &[ModifiedArea],
    ) -> Vec<Suggestion> {
        let key = request.key();
        let now = self.clock.now();
        let stamped: Vec<Suggestion> = suggestions
            .into_iter()
            .filter(|s| request.writing_config.allows(s.kind))
            .filter_map(|mut s| {
                let Some(end) = s.start_offset.checked_add(s.original_text.len()) else {
                    warn!(document = %key, start = s.start_offset, "dropped suggestion with out-of-range offset");
                    return None;
                };
                s.id = SuggestionId::new();
                s.document_id.clone_from(&key.document_id);
                s.user_id.clone_from(&key.user_id);
                s.status = SuggestionStatus::Pending;
                s.confidence = if s.confidence.is_nan() {
                    0.0
                } else {
                    s.confidence.clamp(0.0, 1.0)
                };
                s.end_offset = end;
                s.created_at = now;
                s.updated_at = now;
                Some(s)
            })
            .collect();
        self.tracker.filter_suppressed(areas, stamped)
    }

    async fn current_set(
        &self,
        request: &AnalysisRequest,
        session: &DocumentSession,
    ) -> AnalysisResult<AnalysisOutcome> {
        let pending = self.book.pending(&request.key()).await?;
        Ok(AnalysisOutcome {
            suggestions: merge::revalidate(pending, &request.content),
            analysis_id: session.last_analysis_id.clone().unwrap_or_default(),
            used_differential: false,
            token_savings: None,
            decision: Decision::NoOp,
            from_cache: false,
        })
    }

    async fn resolve_pending(&self, id: &SuggestionId) -> AnalysisResult<Suggestion> {
        let suggestion = self
            .book
            .get(id)
            .await?
            .ok_or_else(|| AnalysisError::SuggestionNotFound(id.clone()))?;
        if !suggestion.is_pending() {
            return Err(AnalysisError::AlreadyResolved {
                id: id.clone(),
                status: suggestion.status,
            });
        }
        Ok(suggestion)
    }

    fn publish_set(&self, key: &DocumentKey, outcome: &AnalysisOutcome) {
        let set = SuggestionSet {
            document_id: key.document_id.clone(),
            user_id: key.user_id.clone(),
            suggestions: outcome.suggestions.clone(),
            analysis_id: Some(outcome.analysis_id.clone()),
        };
        self.book.publish(key, SuggestionEvent::Updated(set));
    }

    async fn publish_current(&self, key: &DocumentKey) {
        let analysis_id = self.sessions.snapshot(key).await.last_analysis_id;
        let set = self.book.snapshot(key, analysis_id).await;
        self.book.publish(key, SuggestionEvent::Updated(set));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::engine::EngineResponse;
    use crate::types::SuggestionType;
    use async_trait::async_trait;
    use redraft_store::{ManualClock, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Flags every "teh" it is shown
    #[derive(Debug, Default)]
    struct TypoEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisEngine for TypoEngine {
        async fn analyze(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let texts: Vec<(usize, String)> = match request.scope {
                EngineScope::Full { content } => vec![(0, content)],
                EngineScope::Window { entries, .. } => entries
                    .into_iter()
                    .map(|e| (e.start_offset, e.text))
                    .collect(),
            };
            let suggestions = texts
                .iter()
                .flat_map(|(base, text)| {
                    text.match_indices("teh").map(move |(at, _)| {
                        Suggestion::new(SuggestionType::Spelling, "teh", "the", base + at)
                    })
                })
                .collect();
            Ok(EngineResponse {
                suggestions,
                analysis_id: AnalysisId::new(),
                processing_time_ms: 1,
            })
        }
    }

    fn orchestrator() -> (AnalysisOrchestrator, Arc<TypoEngine>) {
        let engine = Arc::new(TypoEngine::default());
        let orchestrator = AnalysisOrchestrator::with_clock(
            engine.clone(),
            Arc::new(MemoryStore::new()),
            EngineConfig::default(),
            Arc::new(ManualClock::epoch()),
        );
        (orchestrator, engine)
    }

    #[tokio::test]
    async fn first_request_is_full_then_noop() {
        let (orchestrator, engine) = orchestrator();
        let request = AnalysisRequest::new("d", "u", "I saw teh cat.");

        let first = orchestrator.request_analysis(request.clone()).await.unwrap();
        assert_eq!(first.decision, Decision::Full(FullReason::NoPendingChanges));
        assert_eq!(first.suggestions.len(), 1);

        let second = orchestrator.request_analysis(request).await.unwrap();
        assert_eq!(second.decision, Decision::NoOp);
        assert_eq!(second.suggestions, first.suggestions);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accept_checks_anchor_against_best_known_content() {
        let (orchestrator, _) = orchestrator();
        let key = DocumentKey::new("d", "u");
        let outcome = orchestrator
            .request_analysis(AnalysisRequest::new("d", "u", "I saw teh cat and teh dog."))
            .await
            .unwrap();
        assert_eq!(outcome.suggestions.len(), 2);

        orchestrator
            .sessions
            .update(&key, |s| {
                s.last_content = None;
                s.analyzed_content = Some("Later I saw teh cat and teh dog.".into());
            })
            .await;
        let moved = orchestrator
            .accept_suggestion(&outcome.suggestions[0].id, "the")
            .await
            .unwrap();
        assert_eq!(moved.start_offset, 12);

        orchestrator.sessions.invalidate(&key).await;
        let unchecked = orchestrator
            .accept_suggestion(&outcome.suggestions[1].id, "the")
            .await
            .unwrap();
        assert_eq!(unchecked.start_offset, 18);
        assert_eq!(unchecked.status, SuggestionStatus::Accepted);
    }

    #[tokio::test]
    async fn missing_user_is_rejected() {
        let (orchestrator, _) = orchestrator();
        let err = orchestrator
            .request_analysis(AnalysisRequest::new("d", " ", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn unsaved_documents_are_not_persisted() {
        let (orchestrator, _) = orchestrator();
        let outcome = orchestrator
            .request_analysis(AnalysisRequest::new("", "u", "teh"))
            .await
            .unwrap();
        assert_eq!(outcome.decision, Decision::Full(FullReason::NewDocument));
        assert_eq!(outcome.suggestions[0].document_id, "");
        assert!(orchestrator
            .book()
            .pending(&DocumentKey::new("", "u"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn reject_then_reject_again_fails() {
        let (orchestrator, _) = orchestrator();
        let outcome = orchestrator
            .request_analysis(AnalysisRequest::new("d", "u", "teh"))
            .await
            .unwrap();
        let id = outcome.suggestions[0].id.clone();

        let rejected = orchestrator.reject_suggestion(&id).await.unwrap();
        assert_eq!(rejected.status, SuggestionStatus::Rejected);
        assert!(matches!(
            orchestrator.reject_suggestion(&id).await,
            Err(AnalysisError::AlreadyResolved { .. })
        ));
        assert!(matches!(
            orchestrator.delete_suggestion(&SuggestionId::from("nope")).await,
            Err(AnalysisError::SuggestionNotFound(_))
        ));
    }
}
