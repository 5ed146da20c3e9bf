//! In-memory document store
//!
//! Backs tests and small self-hosted installs. All collections live in one
//! `RwLock`-guarded map; reads take the shared lock, writes the exclusive
//! one. Query evaluation is a linear scan per collection, which is fine at
//! the sizes this store is meant for.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::query::{Direction, Query};
use crate::store::{Document, DocumentStore};

type Collection = BTreeMap<String, Document>;

/// In-memory [`DocumentStore`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Whether a collection is empty or absent
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

/// Total order over JSON values for `order_by`
///
/// Nulls first, then booleans, numbers, strings; everything else compares
/// equal. Good enough for the scalar fields queries actually sort on.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<()> {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, patch: Document) -> Result<()> {
        let mut collections = self.collections.write();
        let doc = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(key))
            .ok_or_else(|| StoreError::not_found(collection, key))?;
        match (doc.as_object_mut(), patch.as_object()) {
            (Some(target), Some(fields)) => {
                for (field, value) in fields {
                    target.insert(field.clone(), value.clone());
                }
                Ok(())
            }
            _ => Err(StoreError::backend("update requires object documents")),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        if let Some(c) = self.collections.write().get_mut(collection) {
            c.remove(key);
        }
        Ok(())
    }

    async fn query(&self, query: Query) -> Result<Vec<Document>> {
        let collections = self.collections.read();
        let mut hits: Vec<Document> = collections
            .get(&query.collection)
            .map(|c| {
                c.values()
                    .filter(|doc| query.filters.iter().all(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        if let Some((field, direction)) = &query.order_by {
            hits.sort_by(|a, b| {
                let ord = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        let hits = hits.into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => hits.take(limit).collect(),
            None => hits.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store
            .set("users", "u1", json!({"email": "a@x.com"}))
            .await
            .unwrap();
        assert_eq!(
            store.get("users", "u1").await.unwrap(),
            Some(json!({"email": "a@x.com"}))
        );

        store.delete("users", "u1").await.unwrap();
        assert_eq!(store.get("users", "u1").await.unwrap(), None);

        // Deleting again is fine
        store.delete("users", "u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = MemoryStore::new();
        store.set("c", "k", json!({"a": 1, "b": 2})).await.unwrap();
        store.set("c", "k", json!({"a": 9})).await.unwrap();
        assert_eq!(store.get("c", "k").await.unwrap(), Some(json!({"a": 9})));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .set("codes", "k", json!({"code": "123456", "attempts": 0}))
            .await
            .unwrap();
        store
            .update("codes", "k", json!({"attempts": 1}))
            .await
            .unwrap();
        assert_eq!(
            store.get("codes", "k").await.unwrap(),
            Some(json!({"code": "123456", "attempts": 1}))
        );
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = MemoryStore::new();
        let err = store
            .update("codes", "nope", json!({"attempts": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = MemoryStore::new();
        store
            .set("students", "s1", json!({"tenantId": "t1", "guardianEmails": ["g@x.com"]}))
            .await
            .unwrap();
        store
            .set("students", "s2", json!({"tenantId": "t2", "guardianEmails": ["g@x.com", "h@x.com"]}))
            .await
            .unwrap();

        let hits = store
            .query(Query::collection("students").filter(Filter::contains("guardianEmails", json!("g@x.com"))))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store
            .query(
                Query::collection("students")
                    .filter(Filter::contains("guardianEmails", json!("g@x.com")))
                    .filter(Filter::eq("tenantId", json!("t2"))),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["tenantId"], json!("t2"));
    }

    #[tokio::test]
    async fn test_query_order_offset_limit() {
        let store = MemoryStore::new();
        for (key, n) in [("a", 3), ("b", 1), ("c", 2), ("d", 4)] {
            store.set("nums", key, json!({"n": n})).await.unwrap();
        }

        let hits = store
            .query(
                Query::collection("nums")
                    .order_by("n", Direction::Descending)
                    .offset(1)
                    .limit(2),
            )
            .await
            .unwrap();
        let ns: Vec<_> = hits.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_query_unknown_collection() {
        let store = MemoryStore::new();
        let hits = store.query(Query::collection("ghosts")).await.unwrap();
        assert!(hits.is_empty());
    }
}
