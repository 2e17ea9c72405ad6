//! Document store contract
//!
//! A key-addressable store of JSON records grouped into named collections,
//! with equality-filtered queries that can be ordered and limited. Backends
//! may be eventually consistent; callers treat "not found" as "not there
//! yet", never as corruption.

use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Record as returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Record key within its collection
    pub id: String,
    /// Record body
    pub data: Value,
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Equality filter on a top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field: String,
    /// Required value
    pub value: Value,
}

/// Query over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// All filters must match
    pub filters: Vec<Filter>,
    /// Optional ordering field
    pub order_by: Option<(String, Direction)>,
    /// Maximum number of records
    pub limit: Option<usize>,
}

impl Query {
    /// Match everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Order by `field`
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Keep at most `limit` records
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `record` satisfies every filter
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| record.get(&f.field) == Some(&f.value))
    }

    /// Apply ordering and limit to already-filtered records
    pub fn finish(&self, records: &mut Vec<StoredRecord>) {
        if let Some((field, direction)) = &self.order_by {
            records.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
    }
}

/// Total order over optional JSON scalars: missing < null < bool < number < string
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Key-addressable record store
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Insert a new record
    ///
    /// # Errors
    /// `AlreadyExists` if the id is taken
    async fn create(&self, collection: &str, id: &str, record: Value) -> StoreResult<()>;

    /// Insert or overwrite a record
    async fn put(&self, collection: &str, id: &str, record: Value) -> StoreResult<()>;

    /// Fetch a record
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Merge `fields` into an existing record
    ///
    /// # Errors
    /// `NotFound` if the record does not exist
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>)
        -> StoreResult<()>;

    /// Remove a record, returning whether it existed
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Run a query over a collection
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<StoredRecord>>;
}
