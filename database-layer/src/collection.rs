use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::backend::DocumentBackend;
use crate::error::{DatabaseError, DatabaseResult};
use crate::query::{Filter, Query};
use crate::schema::Document;

/// Typed handle onto one collection. Every write is schema-checked first.
pub struct Collection<T: Document> {
    backend: Arc<dyn DocumentBackend>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    pub async fn ensure(&self) -> DatabaseResult<()> {
        self.backend
            .ensure_collection(T::COLLECTION, &T::indexes())
            .await
    }

    pub async fn insert(&self, doc: &T) -> DatabaseResult<()> {
        doc.validate()?;
        let value = serde_json::to_value(doc)?;
        self.backend.insert(T::COLLECTION, doc.id(), value).await
    }

    pub async fn replace(&self, doc: &T) -> DatabaseResult<()> {
        doc.validate()?;
        let value = serde_json::to_value(doc)?;
        self.backend.replace(T::COLLECTION, doc.id(), value).await
    }

    pub async fn get(&self, id: Uuid) -> DatabaseResult<Option<T>> {
        match self.backend.get(T::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Like [`Collection::get`] but a missing document is an error.
    pub async fn require(&self, id: Uuid) -> DatabaseResult<T> {
        self.get(id).await?.ok_or_else(|| DatabaseError::NotFound {
            collection: T::COLLECTION.to_string(),
            id,
        })
    }

    pub async fn find(&self, query: &Query) -> DatabaseResult<Vec<T>> {
        self.backend
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(DatabaseError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: Filter) -> DatabaseResult<Option<T>> {
        let mut found = self.find(&Query::filter(filter).limit(1)).await?;
        Ok(found.pop())
    }

    pub async fn count(&self, filter: &Filter) -> DatabaseResult<u64> {
        self.backend.count(T::COLLECTION, filter).await
    }

    pub async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        self.backend.delete(T::COLLECTION, id).await
    }
}
