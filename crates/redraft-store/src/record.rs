//! Strongly-typed records over the untyped store
//!
//! [`Collection<R>`] is the boundary where JSON becomes domain types:
//! records are validated before they are written and after they are read,
//! so a half-written or foreign record never reaches engine logic.

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, Query};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// A persisted domain record
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the record lives in
    const COLLECTION: &'static str;

    /// Record key
    fn id(&self) -> String;

    /// Check required-field invariants
    ///
    /// # Errors
    /// Returns the reason the record is invalid
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Typed view of one collection
#[derive(Debug)]
pub struct Collection<R> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<R: Record> Collection<R> {
    /// Bind to `store`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn encode(record: &R) -> StoreResult<Value> {
        record
            .validate()
            .map_err(|reason| StoreError::validation(R::COLLECTION, record.id(), reason))?;
        Ok(serde_json::to_value(record)?)
    }

    fn decode(id: &str, data: Value) -> StoreResult<R> {
        let record: R = serde_json::from_value(data)
            .map_err(|e| StoreError::validation(R::COLLECTION, id, e.to_string()))?;
        record
            .validate()
            .map_err(|reason| StoreError::validation(R::COLLECTION, id, reason))?;
        Ok(record)
    }

    /// Insert a new record
    pub async fn create(&self, record: &R) -> StoreResult<()> {
        let data = Self::encode(record)?;
        self.store.create(R::COLLECTION, &record.id(), data).await
    }

    /// Insert or overwrite a record
    pub async fn put(&self, record: &R) -> StoreResult<()> {
        let data = Self::encode(record)?;
        self.store.put(R::COLLECTION, &record.id(), data).await
    }

    /// Fetch and validate a record
    pub async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        match self.store.get(R::COLLECTION, id).await? {
            Some(data) => Self::decode(id, data).map(Some),
            None => Ok(None),
        }
    }

    /// Merge raw fields into a record
    pub async fn update(&self, id: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.store.update(R::COLLECTION, id, fields).await
    }

    /// Remove a record
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(R::COLLECTION, id).await
    }

    /// Query and decode records
    ///
    /// Records that fail validation are skipped with a warning rather than
    /// failing the whole query.
    pub async fn query(&self, query: &Query) -> StoreResult<Vec<R>> {
        let raw = self.store.query(R::COLLECTION, query).await?;
        Ok(raw
            .into_iter()
            .filter_map(|stored| match Self::decode(&stored.id, stored.data) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(collection = R::COLLECTION, error = %e, "skipping invalid record");
                    None
                }
            })
            .collect())
    }
}
