//! In-process [`DocumentStore`]
//!
//! Collections are independent `DashMap` shards, so operations on different
//! collections never contend. Reads return clones and see writes immediately.

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, Query, StoredRecord};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};

/// Concurrent in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Value>>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `collection`
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    /// Whether `collection` holds no records
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn collection(
        &self,
        name: &str,
    ) -> dashmap::mapref::one::RefMut<'_, String, DashMap<String, Value>> {
        self.collections.entry(name.to_string()).or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, id: &str, record: Value) -> StoreResult<()> {
        let shard = self.collection(collection);
        let created = match shard.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        };
        created
    }

    async fn put(&self, collection: &str, id: &str, record: Value) -> StoreResult<()> {
        self.collection(collection).insert(id.to_string(), record);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|c| c.get(id).map(|r| r.value().clone())))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        let shard = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let mut record = shard
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let Value::Object(existing) = record.value_mut() else {
            return Err(StoreError::validation(collection, id, "record is not an object"));
        };
        existing.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        Ok(self
            .collections
            .get(collection)
            .is_some_and(|c| c.remove(id).is_some()))
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<StoredRecord>> {
        let Some(shard) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut records: Vec<StoredRecord> = shard
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| StoredRecord {
                id: entry.key().clone(),
                data: entry.value().clone(),
            })
            .collect();
        drop(shard);

        if query.order_by.is_none() {
            records.sort_by(|a, b| a.id.cmp(&b.id));
        }
        query.finish(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Direction;
    use serde_json::json;

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = MemoryStore::new();
        store.create("c", "1", json!({"a": 1})).await.unwrap();
        let err = store.create("c", "1", json!({"a": 2})).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.get("c", "1").await.unwrap(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        store.put("c", "1", json!({"a": 1, "b": 2})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("b".into(), json!(3));
        store.update("c", "1", fields).await.unwrap();

        assert_eq!(store.get("c", "1").await.unwrap(), Some(json!({"a": 1, "b": 3})));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("c", "nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryStore::new();
        store.put("c", "1", json!({})).await.unwrap();
        assert!(store.delete("c", "1").await.unwrap());
        assert!(!store.delete("c", "1").await.unwrap());
        assert!(!store.delete("other", "1").await.unwrap());
    }

    #[tokio::test]
    async fn query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (id, user, at) in [("a", "u1", 3), ("b", "u2", 1), ("c", "u1", 2), ("d", "u1", 9)] {
            store
                .put("c", id, json!({"user": user, "at": at}))
                .await
                .unwrap();
        }

        let q = Query::new()
            .filter("user", "u1")
            .order_by("at", Direction::Ascending)
            .limit(2);
        let ids: Vec<_> = store
            .query("c", &q)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(store.len("c"), 4);
        assert!(store.is_empty("missing"));
    }
}
