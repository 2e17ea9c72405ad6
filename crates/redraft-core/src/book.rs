//! Suggestion book
//!
//! Durable home of each document's suggestions plus the broadcast hub that
//! pushes set changes to subscribers. Accepted and rejected suggestions stay
//! in the store for history; only pending ones make up the live set.

use crate::types::{AnalysisId, DocumentKey, Suggestion, SuggestionId, SuggestionStatus};
use dashmap::DashMap;
use futures::stream::{self, Stream};
use redraft_store::{Collection, DocumentStore, Query, StoreResult};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events buffered per document before slow subscribers start lagging
const CHANNEL_CAPACITY: usize = 64;

/// Live suggestion set of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionSet {
    /// Document id
    pub document_id: String,
    /// User id
    pub user_id: String,
    /// Pending suggestions sorted by start offset
    pub suggestions: Vec<Suggestion>,
    /// Analysis that produced the set, if any
    pub analysis_id: Option<AnalysisId>,
}

/// Change notification
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionEvent {
    /// The set changed
    Updated(SuggestionSet),
    /// An analysis failed; the set is unchanged
    Failed(String),
}

/// Subscription to one document's suggestion set
///
/// The first event is always a snapshot of the current set. Dropping or
/// cancelling the subscription unsubscribes.
#[derive(Debug)]
pub struct SuggestionSubscription {
    initial: Option<SuggestionSet>,
    receiver: broadcast::Receiver<SuggestionEvent>,
}

impl SuggestionSubscription {
    /// Wait for the next event; `None` once the hub is gone
    pub async fn next(&mut self) -> Option<SuggestionEvent> {
        if let Some(initial) = self.initial.take() {
            return Some(SuggestionEvent::Updated(initial));
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Later events carry the full set, so skipping is lossless.
                    debug!(skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Event already queued, without waiting
    pub fn try_next(&mut self) -> Option<SuggestionEvent> {
        if let Some(initial) = self.initial.take() {
            return Some(SuggestionEvent::Updated(initial));
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }

    /// Stop receiving events
    pub fn cancel(self) {
        drop(self);
    }

    /// Adapt into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = SuggestionEvent> {
        stream::unfold(self, |mut sub| async move {
            let event = sub.next().await?;
            Some((event, sub))
        })
    }
}

/// Store-backed suggestion sets with change notification
#[derive(Debug, Clone)]
pub struct SuggestionBook {
    suggestions: Collection<Suggestion>,
    channels: Arc<DashMap<DocumentKey, broadcast::Sender<SuggestionEvent>>>,
}

impl SuggestionBook {
    /// Create book over `store`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            suggestions: Collection::new(store),
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Pending suggestions of a document, sorted by start offset
    ///
    /// # Errors
    /// Returns the store error if the query fails
    pub async fn pending(&self, key: &DocumentKey) -> StoreResult<Vec<Suggestion>> {
        let query = Query::new()
            .filter("document_id", key.document_id.as_str())
            .filter("user_id", key.user_id.as_str())
            .filter("status", "pending");
        let mut pending = self.suggestions.query(&query).await?;
        crate::merge::sort_by_position(&mut pending);
        Ok(pending)
    }

    /// Fetch one suggestion
    ///
    /// # Errors
    /// Returns the store error if the read fails
    pub async fn get(&self, id: &SuggestionId) -> StoreResult<Option<Suggestion>> {
        self.suggestions.get(id.as_str()).await
    }

    /// Write one suggestion
    ///
    /// # Errors
    /// Returns the store error if the write fails
    pub async fn save(&self, suggestion: &Suggestion) -> StoreResult<()> {
        self.suggestions.put(suggestion).await
    }

    /// Remove one suggestion
    ///
    /// # Errors
    /// Returns the store error if the delete fails
    pub async fn delete(&self, id: &SuggestionId) -> StoreResult<bool> {
        self.suggestions.delete(id.as_str()).await
    }

    /// Make `next` the pending set of a document
    ///
    /// `next` is written first, then pending suggestions missing from it are
    /// deleted, so a failed write never leaves fewer suggestions than before.
    /// Resolved ones are left alone.
    ///
    /// # Errors
    /// Returns the first store error
    pub async fn replace_pending(&self, key: &DocumentKey, next: &[Suggestion]) -> StoreResult<()> {
        for suggestion in next {
            debug_assert_eq!(suggestion.status, SuggestionStatus::Pending);
            self.suggestions.put(suggestion).await?;
        }
        let keep: HashSet<&SuggestionId> = next.iter().map(|s| &s.id).collect();
        for old in self.pending(key).await? {
            if !keep.contains(&old.id) {
                self.suggestions.delete(old.id.as_str()).await?;
            }
        }
        Ok(())
    }

    /// Current set for a document; empty if the store fails
    pub async fn snapshot(&self, key: &DocumentKey, analysis_id: Option<AnalysisId>) -> SuggestionSet {
        let suggestions = match self.pending(key).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(document = %key, error = %e, "failed to load suggestions");
                Vec::new()
            }
        };
        SuggestionSet {
            document_id: key.document_id.clone(),
            user_id: key.user_id.clone(),
            suggestions,
            analysis_id,
        }
    }

    /// Subscribe to a document's set
    pub async fn subscribe(
        &self,
        key: &DocumentKey,
        analysis_id: Option<AnalysisId>,
    ) -> SuggestionSubscription {
        let receiver = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        let initial = self.snapshot(key, analysis_id).await;
        SuggestionSubscription {
            initial: Some(initial),
            receiver,
        }
    }

    /// Push an event to a document's subscribers
    ///
    /// Channels without receivers are dropped.
    pub fn publish(&self, key: &DocumentKey, event: SuggestionEvent) {
        let delivered = match self.channels.get(key) {
            Some(sender) => sender.send(event).is_ok(),
            None => return,
        };
        if !delivered {
            self.channels
                .remove_if(key, |_, sender| sender.receiver_count() == 0);
        }
    }

    /// Number of documents with a live channel
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SuggestionType;
    use futures::StreamExt;
    use redraft_store::MemoryStore;

    fn key() -> DocumentKey {
        DocumentKey::new("d", "u")
    }

    fn suggestion(original: &str, start: usize) -> Suggestion {
        Suggestion::new(SuggestionType::Spelling, original, "x", start).for_document(&key())
    }

    #[tokio::test]
    async fn replace_pending_keeps_resolved() {
        let book = SuggestionBook::new(Arc::new(MemoryStore::new()));
        let a = suggestion("a", 5);
        let b = suggestion("b", 1);
        let mut accepted = suggestion("c", 9);
        accepted.status = SuggestionStatus::Accepted;

        book.save(&accepted).await.unwrap();
        book.replace_pending(&key(), &[a.clone(), b.clone()]).await.unwrap();
        let ids: Vec<_> = book.pending(&key()).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![b.id.clone(), a.id.clone()]);

        book.replace_pending(&key(), &[b.clone()]).await.unwrap();
        assert_eq!(book.pending(&key()).await.unwrap().len(), 1);
        assert!(book.get(&a.id).await.unwrap().is_none());
        assert!(book.get(&accepted.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn subscription_starts_with_snapshot() {
        let book = SuggestionBook::new(Arc::new(MemoryStore::new()));
        book.replace_pending(&key(), &[suggestion("a", 0)]).await.unwrap();

        let mut sub = book.subscribe(&key(), None).await;
        match sub.next().await {
            Some(SuggestionEvent::Updated(set)) => assert_eq!(set.suggestions.len(), 1),
            other => panic!("expected snapshot, got {other:?}"),
        }

        book.publish(&key(), SuggestionEvent::Failed("engine down".into()));
        assert_eq!(
            sub.next().await,
            Some(SuggestionEvent::Failed("engine down".into()))
        );
    }

    #[tokio::test]
    async fn cancelled_subscriptions_release_channel() {
        let book = SuggestionBook::new(Arc::new(MemoryStore::new()));
        let sub = book.subscribe(&key(), None).await;
        assert_eq!(book.channel_count(), 1);
        sub.cancel();
        book.publish(&key(), SuggestionEvent::Failed("x".into()));
        assert_eq!(book.channel_count(), 0);
    }

    #[tokio::test]
    async fn stream_yields_events() {
        let book = SuggestionBook::new(Arc::new(MemoryStore::new()));
        let sub = book.subscribe(&key(), None).await;
        book.publish(&key(), SuggestionEvent::Failed("boom".into()));
        let events: Vec<_> = sub.into_stream().take(2).collect().await;
        assert!(matches!(events[0], SuggestionEvent::Updated(_)));
        assert_eq!(events[1], SuggestionEvent::Failed("boom".into()));
    }
}
