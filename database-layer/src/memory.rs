// In-memory document backend for development and tests
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::DocumentBackend;
use crate::error::{DatabaseError, DatabaseResult};
use crate::query::{compare_json, Filter, Query, SortDirection};
use crate::schema::IndexSpec;

#[derive(Default)]
struct MemoryCollection {
    documents: DashMap<Uuid, JsonValue>,
    unique_indexes: Vec<IndexSpec>,
    /// Held across the unique check and the write it guards.
    writes: Mutex<()>,
}

impl MemoryCollection {
    fn index_key(index: &IndexSpec, doc: &JsonValue) -> Vec<JsonValue> {
        index
            .fields
            .iter()
            .map(|f| doc.get(*f).cloned().unwrap_or(JsonValue::Null))
            .collect()
    }

    /// Unique-index check against every other document in the collection.
    fn check_unique(&self, collection: &str, id: Uuid, doc: &JsonValue) -> DatabaseResult<()> {
        for index in &self.unique_indexes {
            let key = Self::index_key(index, doc);
            let clash = self.documents.iter().any(|entry| {
                *entry.key() != id && Self::index_key(index, entry.value()) == key
            });
            if clash {
                return Err(DatabaseError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// DashMap-backed store. Unique indexes are enforced; other indexes are
/// accepted and ignored.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    collections: Arc<DashMap<String, Arc<MemoryCollection>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> DatabaseResult<Arc<MemoryCollection>> {
        self.collections
            .get(name)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| DatabaseError::UnknownCollection(name.to_string()))
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> DatabaseResult<()> {
        self.collections
            .entry(collection.to_string())
            .or_insert_with(|| {
                Arc::new(MemoryCollection {
                    documents: DashMap::new(),
                    unique_indexes: indexes.iter().filter(|i| i.unique).cloned().collect(),
                    writes: Mutex::new(()),
                })
            });
        Ok(())
    }

    async fn insert(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
        let coll = self.collection(collection)?;
        let _guard = coll.writes.lock().await;
        if coll.documents.contains_key(&id) {
            return Err(DatabaseError::DuplicateKey {
                collection: collection.to_string(),
                index: "primary".to_string(),
            });
        }
        coll.check_unique(collection, id, &doc)?;
        coll.documents.insert(id, doc);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
        let coll = self.collection(collection)?;
        let _guard = coll.writes.lock().await;
        if !coll.documents.contains_key(&id) {
            return Err(DatabaseError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        coll.check_unique(collection, id, &doc)?;
        coll.documents.insert(id, doc);
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> DatabaseResult<Option<JsonValue>> {
        let coll = self.collection(collection)?;
        Ok(coll.documents.get(&id).map(|d| d.value().clone()))
    }

    async fn find(&self, collection: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>> {
        let coll = self.collection(collection)?;
        let mut matched: Vec<(Uuid, JsonValue)> = coll
            .documents
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|(id_a, a), (id_b, b)| {
                let null = JsonValue::Null;
                let ord = compare_json(
                    a.get(&sort.field).unwrap_or(&null),
                    b.get(&sort.field).unwrap_or(&null),
                )
                .then_with(|| id_a.cmp(id_b));
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> DatabaseResult<u64> {
        let coll = self.collection(collection)?;
        let count = coll
            .documents
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(count as u64)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> DatabaseResult<bool> {
        let coll = self.collection(collection)?;
        Ok(coll.documents.remove(&id).is_some())
    }

    async fn ping(&self) -> DatabaseResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UNIQUE_EMAIL: &[IndexSpec] = &[IndexSpec::unique("users_email", &["email"])];

    async fn backend() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.ensure_collection("users", UNIQUE_EMAIL).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_unknown_collection_is_rejected() {
        let backend = InMemoryBackend::new();
        let err = backend.insert("nope", Uuid::new_v4(), json!({})).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UnknownCollection(_)));
    }

    #[tokio::test]
    async fn test_unique_index_blocks_duplicates() {
        let backend = backend().await;
        backend
            .insert("users", Uuid::new_v4(), json!({"email": "a@b.io"}))
            .await
            .unwrap();
        let err = backend
            .insert("users", Uuid::new_v4(), json!({"email": "a@b.io"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateKey { .. }));
        assert_eq!(backend.count("users", &Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_keep_unique_index() {
        for _ in 0..20 {
            let backend = backend().await;
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let backend = backend.clone();
                    tokio::spawn(async move {
                        backend
                            .insert("users", Uuid::new_v4(), json!({"email": "same@x.io"}))
                            .await
                    })
                })
                .collect();
            let mut stored = 0;
            for handle in handles {
                if handle.await.unwrap().is_ok() {
                    stored += 1;
                }
            }
            assert_eq!(stored, 1);
            assert_eq!(backend.count("users", &Filter::new()).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_replace_keeps_own_unique_value() {
        let backend = backend().await;
        let id = Uuid::new_v4();
        backend.insert("users", id, json!({"email": "a@b.io", "n": 1})).await.unwrap();
        backend.replace("users", id, json!({"email": "a@b.io", "n": 2})).await.unwrap();
        assert_eq!(backend.get("users", id).await.unwrap().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn test_replace_missing_document() {
        let backend = backend().await;
        let err = backend
            .replace("users", Uuid::new_v4(), json!({"email": "x@y.io"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let backend = backend().await;
        for (i, email) in ["c@x.io", "a@x.io", "b@x.io"].iter().enumerate() {
            backend
                .insert("users", Uuid::new_v4(), json!({"email": email, "rank": i}))
                .await
                .unwrap();
        }
        let docs = backend
            .find("users", &Query::new().sort_asc("email").offset(1).limit(5))
            .await
            .unwrap();
        let emails: Vec<_> = docs.iter().map(|d| d["email"].as_str().unwrap()).collect();
        assert_eq!(emails, vec!["b@x.io", "c@x.io"]);

        let docs = backend
            .find("users", &Query::new().sort_desc("rank").limit(1))
            .await
            .unwrap();
        assert_eq!(docs[0]["email"], "b@x.io");
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = backend().await;
        let id = Uuid::new_v4();
        backend.insert("users", id, json!({"email": "d@x.io"})).await.unwrap();
        assert!(backend.delete("users", id).await.unwrap());
        assert!(!backend.delete("users", id).await.unwrap());
        assert!(backend.get("users", id).await.unwrap().is_none());
    }
}
