use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("{collection} document {id} not found")]
    NotFound { collection: String, id: Uuid },

    #[error("Duplicate key in {collection} (index {index})")]
    DuplicateKey { collection: String, index: String },

    #[error("Schema violation in {collection}: {message}")]
    SchemaViolation { collection: String, message: String },

    #[error("Collection {0} has not been initialised")]
    UnknownCollection(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl DatabaseError {
    pub fn schema(collection: &str, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            collection: collection.to_string(),
            message: message.into(),
        }
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
