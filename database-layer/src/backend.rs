use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::DatabaseResult;
use crate::query::{Filter, Query};
use crate::schema::IndexSpec;

/// Storage engine behind every [`crate::Collection`].
///
/// Documents cross this boundary as JSON; typing and schema validation live
/// one layer up so each engine only has to store, filter and sort.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Short engine name for health output.
    fn name(&self) -> &'static str;

    /// Creates the collection and its declared indexes if they are absent.
    async fn ensure_collection(&self, collection: &str, indexes: &[IndexSpec])
        -> DatabaseResult<()>;

    async fn insert(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()>;

    /// Replaces an existing document; fails with `NotFound` if it is absent.
    async fn replace(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()>;

    async fn get(&self, collection: &str, id: Uuid) -> DatabaseResult<Option<JsonValue>>;

    async fn find(&self, collection: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>>;

    async fn count(&self, collection: &str, filter: &Filter) -> DatabaseResult<u64>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: Uuid) -> DatabaseResult<bool>;

    async fn ping(&self) -> DatabaseResult<()>;
}
