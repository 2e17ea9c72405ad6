//! Testing utilities for Redraft workspace
//!
//! Shared engines, stores and fixtures for integration tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use redraft_core::{
    AnalysisEngine, AnalysisId, AnalysisOrchestrator, DocumentKey, EngineConfig, EngineError,
    EngineRequest, EngineResponse, EngineScope, Suggestion, SuggestionType,
};
use redraft_store::{
    DocumentStore, ManualClock, MemoryStore, Query, StoreError, StoreResult, StoredRecord,
};
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Word the scripted engine flags
#[derive(Debug, Clone)]
pub struct Rule {
    pub needle: String,
    pub replacement: String,
    pub kind: SuggestionType,
}

/// Engine double
///
/// Queued scripts are consumed first; once the queue is empty every call
/// flags each rule needle found in the text it was shown, at the right
/// document offsets. While [`hold`](ScriptedEngine::hold) is in effect
/// calls park until [`release`](ScriptedEngine::release).
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    rules: Vec<Rule>,
    queue: Mutex<VecDeque<Result<Vec<Suggestion>, EngineError>>>,
    failure: Mutex<Option<EngineError>>,
    requests: Mutex<Vec<EngineRequest>>,
    calls: AtomicUsize,
    held: AtomicBool,
    parked: Notify,
    released: Notify,
}

impl ScriptedEngine {
    /// Engine that flags "teh" as a spelling error
    #[must_use]
    pub fn new() -> Self {
        Self::default().with_rule("teh", "the", SuggestionType::Spelling)
    }

    /// Engine with no rules
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Flag `needle`
    #[must_use]
    pub fn with_rule(mut self, needle: &str, replacement: &str, kind: SuggestionType) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            replacement: replacement.to_string(),
            kind,
        });
        self
    }

    /// Answer the next call with `suggestions`
    pub fn respond_with(&self, suggestions: Vec<Suggestion>) {
        self.queue.lock().push_back(Ok(suggestions));
    }

    /// Fail the next call
    pub fn fail_next(&self, error: EngineError) {
        self.queue.lock().push_back(Err(error));
    }

    /// Fail every call until [`recover`](Self::recover)
    pub fn fail_always(&self, error: EngineError) {
        *self.failure.lock() = Some(error);
    }

    /// Stop failing
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Park every following call until [`release`](Self::release)
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Wait until a call is parked
    pub async fn parked(&self) {
        self.parked.notified().await;
    }

    /// Let the parked call and all later ones through
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_one();
    }

    /// Calls made so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().clone()
    }

    /// Most recent request
    #[must_use]
    pub fn last_request(&self) -> Option<EngineRequest> {
        self.requests.lock().last().cloned()
    }

    fn flag(&self, scope: &EngineScope) -> Vec<Suggestion> {
        let texts: Vec<(usize, &str)> = match scope {
            EngineScope::Full { content } => vec![(0, content.as_str())],
            EngineScope::Window { entries, .. } => entries
                .iter()
                .map(|e| (e.start_offset, e.text.as_str()))
                .collect(),
        };
        let mut out = Vec::new();
        for (base, text) in texts {
            for rule in &self.rules {
                for (at, _) in text.match_indices(rule.needle.as_str()) {
                    out.push(
                        Suggestion::new(rule.kind, &rule.needle, &rule.replacement, base + at)
                            .with_confidence(0.9),
                    );
                }
            }
        }
        out
    }
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn analyze(&self, request: EngineRequest) -> Result<EngineResponse, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if self.held.load(Ordering::SeqCst) {
            self.parked.notify_one();
            self.released.notified().await;
        }

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        let scripted = self.queue.lock().pop_front();
        let suggestions = match scripted {
            Some(result) => result?,
            None => self.flag(&request.scope),
        };
        Ok(EngineResponse {
            suggestions,
            analysis_id: AnalysisId::new(),
            processing_time_ms: 5,
        })
    }
}

/// Store that fails on demand
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    write_budget: Mutex<Option<usize>>,
}

impl FlakyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation on `collection`
    pub fn fail_collection(&self, collection: &str) {
        self.failing.lock().insert(collection.to_string());
    }

    /// Fail every operation
    pub fn fail_everything(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Let `writes` more writes through, then fail every write
    pub fn allow_writes(&self, writes: usize) {
        *self.write_budget.lock() = Some(writes);
    }

    /// Stop failing
    pub fn heal(&self) {
        self.failing.lock().clear();
        self.fail_all.store(false, Ordering::SeqCst);
        *self.write_budget.lock() = None;
    }

    /// Records in `collection` on the healthy backing store
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.inner.len(collection)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.inner.is_empty(collection)
    }

    fn check(&self, collection: &str) -> StoreResult<()> {
        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().contains(collection) {
            return Err(StoreError::Unavailable(format!("{collection} is unavailable")));
        }
        Ok(())
    }

    fn check_write(&self, collection: &str) -> StoreResult<()> {
        self.check(collection)?;
        match self.write_budget.lock().as_mut() {
            Some(0) => Err(StoreError::Unavailable(format!("{collection} rejected the write"))),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(&self, collection: &str, id: &str, record: Value) -> StoreResult<()> {
        self.check_write(collection)?;
        self.inner.create(collection, id, record).await
    }

    async fn put(&self, collection: &str, id: &str, record: Value) -> StoreResult<()> {
        self.check_write(collection)?;
        self.inner.put(collection, id, record).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        self.check(collection)?;
        self.inner.get(collection, id).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        self.check_write(collection)?;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.check_write(collection)?;
        self.inner.delete(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<StoredRecord>> {
        self.check(collection)?;
        self.inner.query(collection, query).await
    }
}

/// Orchestrator wired to test doubles
#[derive(Debug)]
pub struct Harness {
    pub orchestrator: AnalysisOrchestrator,
    pub engine: Arc<ScriptedEngine>,
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with(ScriptedEngine::new(), EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with(ScriptedEngine::new(), config)
    }

    #[must_use]
    pub fn with(engine: ScriptedEngine, config: EngineConfig) -> Self {
        let engine = Arc::new(engine);
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::epoch());
        let orchestrator = AnalysisOrchestrator::with_clock(
            engine.clone(),
            store.clone(),
            config,
            clock.clone(),
        );
        Self {
            orchestrator,
            engine,
            store,
            clock,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Key used by most tests
#[must_use]
pub fn doc_key() -> DocumentKey {
    DocumentKey::new("doc-1", "user-1")
}

/// Document of `n` distinct paragraphs
#[must_use]
pub fn document(n: usize) -> String {
    (0..n)
        .map(|i| format!("Paragraph {i} discusses topic number {i} in some detail."))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Replace paragraph `index` of a document built from blank-line separated paragraphs
#[must_use]
pub fn replace_paragraph(content: &str, index: usize, text: &str) -> String {
    let mut paragraphs: Vec<String> = redraft_text::segment(content)
        .into_iter()
        .map(|p| p.text)
        .collect();
    if let Some(slot) = paragraphs.get_mut(index) {
        *slot = text.to_string();
    } else {
        paragraphs.push(text.to_string());
    }
    paragraphs.join("\n\n")
}

/// Pending suggestion for the first occurrence of `needle`
///
/// # Panics
/// Panics if `needle` does not occur in `content`
#[must_use]
pub fn suggestion_at(
    content: &str,
    needle: &str,
    replacement: &str,
    kind: SuggestionType,
) -> Suggestion {
    let start = content
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not in fixture"));
    Suggestion::new(kind, needle, replacement, start).for_document(&doc_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_segment_as_expected() {
        let doc = document(4);
        assert_eq!(redraft_text::segment(&doc).len(), 4);
        let edited = replace_paragraph(&doc, 2, "Changed.");
        assert_eq!(redraft_text::segment(&edited)[2].text, "Changed.");
    }

    #[tokio::test]
    async fn scripted_engine_flags_at_document_offsets() {
        let engine = ScriptedEngine::new();
        let content = "ok teh";
        let response = engine
            .analyze(EngineRequest {
                document_id: "d".into(),
                user_id: "u".into(),
                scope: EngineScope::Full {
                    content: content.into(),
                },
                writing_config: redraft_core::WritingConfig::default(),
                previously_modified_areas: Vec::new(),
                paragraph_tags: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(response.suggestions[0].start_offset, 3);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn held_engine_waits_for_release() {
        let engine = ScriptedEngine::new();
        engine.hold();
        let request = EngineRequest {
            document_id: "d".into(),
            user_id: "u".into(),
            scope: EngineScope::Full {
                content: "teh".into(),
            },
            writing_config: redraft_core::WritingConfig::default(),
            previously_modified_areas: Vec::new(),
            paragraph_tags: Vec::new(),
        };
        let (response, ()) = tokio::join!(engine.analyze(request), async {
            engine.parked().await;
            assert_eq!(engine.calls(), 1);
            engine.release();
        });
        assert_eq!(response.unwrap().suggestions.len(), 1);
    }

    #[tokio::test]
    async fn flaky_store_fails_selected_collections() {
        let store = FlakyStore::new();
        store.fail_collection("a");
        assert!(store.put("a", "1", Value::Null).await.is_err());
        assert!(store.put("b", "1", Value::Null).await.is_ok());
        store.heal();
        assert!(store.put("a", "1", Value::Null).await.is_ok());
    }

    #[tokio::test]
    async fn write_budget_runs_out() {
        let store = FlakyStore::new();
        store.allow_writes(1);
        assert!(store.put("a", "1", Value::Null).await.is_ok());
        assert!(store.put("a", "2", Value::Null).await.is_err());
        assert!(store.get("a", "1").await.unwrap().is_some());
        store.heal();
        assert!(store.put("a", "2", Value::Null).await.is_ok());
    }
}
