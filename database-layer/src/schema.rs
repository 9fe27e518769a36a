//! Per-collection schema: declared indexes and the validation hook every
//! document type runs before it is written.

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::DatabaseResult;

/// Secondary index declared by a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    /// Top-level document fields, in index order.
    pub fields: &'static [&'static str],
    pub unique: bool,
}

impl IndexSpec {
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            name,
            fields,
            unique: false,
        }
    }

    pub const fn unique(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            name,
            fields,
            unique: true,
        }
    }
}

/// A type stored as one document in one collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;

    fn indexes() -> Vec<IndexSpec>;

    /// Schema check run before every insert and replace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DatabaseError::SchemaViolation`] describing the first
    /// violated rule.
    fn validate(&self) -> DatabaseResult<()>;
}

/// Collection and field names end up inside SQL text, so only plain
/// lower-case identifiers are accepted.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    name.len() <= 48
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
