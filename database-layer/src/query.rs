// Query description shared by every backend
use std::cmp::Ordering;

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::DatabaseResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Conjunction of field predicates on top-level document fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Field must equal the value exactly.
    pub equals: Vec<(String, JsonValue)>,
    /// Field must be a string containing the needle, case-insensitively.
    pub contains: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Fails when `value` cannot be represented as JSON.
    pub fn eq(mut self, field: &str, value: impl Serialize) -> DatabaseResult<Self> {
        self.equals
            .push((field.to_string(), serde_json::to_value(value)?));
        Ok(self)
    }

    pub fn contains_text(mut self, field: &str, needle: &str) -> Self {
        self.contains.push((field.to_string(), needle.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.contains.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.equals
            .iter()
            .map(|(f, _)| f.as_str())
            .chain(self.contains.iter().map(|(f, _)| f.as_str()))
    }

    /// In-process evaluation, used by the in-memory backend.
    pub fn matches(&self, doc: &JsonValue) -> bool {
        let equal = self
            .equals
            .iter()
            .all(|(field, value)| doc.get(field).unwrap_or(&JsonValue::Null) == value);
        equal
            && self.contains.iter().all(|(field, needle)| {
                doc.get(field)
                    .and_then(JsonValue::as_str)
                    .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            })
    }

    /// Equality predicates folded into one object, for JSONB containment.
    pub fn containment_object(&self) -> JsonValue {
        let map = self
            .equals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue::Object(map)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort = Some(Sort {
            field: field.to_string(),
            direction: SortDirection::Descending,
        });
        self
    }

    pub fn sort_asc(mut self, field: &str) -> Self {
        self.sort = Some(Sort {
            field: field.to_string(),
            direction: SortDirection::Ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Total order over JSON scalars used for in-memory sorting.
///
/// Nulls and missing fields sort first; numbers numerically; strings
/// lexicographically, except that two RFC 3339 timestamps compare as instants.
/// chrono writes a variable number of fractional digits, so the text order of
/// timestamps is not chronological.
pub fn compare_json(a: &JsonValue, b: &JsonValue) -> Ordering {
    fn rank(v: &JsonValue) -> u8 {
        match v {
            JsonValue::Null => 0,
            JsonValue::Bool(_) => 1,
            JsonValue::Number(_) => 2,
            JsonValue::String(_) => 3,
            JsonValue::Array(_) => 4,
            JsonValue::Object(_) => 5,
        }
    }
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_equality_and_text() {
        let doc = json!({"status": "draft", "name": "Maria Lopez", "score": 3});
        let filter = Filter::new()
            .eq("status", "draft")
            .unwrap()
            .contains_text("name", "lopez");
        assert!(filter.matches(&doc));

        let filter = Filter::new().eq("status", "approved").unwrap();
        assert!(!filter.matches(&doc));
    }

    #[test]
    fn missing_field_only_matches_null() {
        let doc = json!({"a": 1});
        assert!(Filter::new().eq("patient_id", JsonValue::Null).unwrap().matches(&doc));
        assert!(!Filter::new().eq("patient_id", "x").unwrap().matches(&doc));
    }

    #[test]
    fn containment_object_folds_equalities() {
        let filter = Filter::new()
            .eq("doctor_id", "d1")
            .unwrap()
            .eq("status", "pending")
            .unwrap();
        assert_eq!(
            filter.containment_object(),
            json!({"doctor_id": "d1", "status": "pending"})
        );
    }

    #[test]
    fn json_ordering() {
        assert_eq!(compare_json(&json!(1), &json!(2.5)), Ordering::Less);
        assert_eq!(
            compare_json(&json!("2024-01-02T00:00:00Z"), &json!("2024-01-01T00:00:00Z")),
            Ordering::Greater
        );
        assert_eq!(compare_json(&JsonValue::Null, &json!("a")), Ordering::Less);
    }

    #[test]
    fn timestamps_order_by_instant_not_text() {
        let millis = json!("2024-01-01T00:00:00.123Z");
        let micros = json!("2024-01-01T00:00:00.123456Z");
        assert_eq!(compare_json(&millis, &micros), Ordering::Less);
        assert_eq!(
            compare_json(&json!("2024-01-01T00:00:00Z"), &json!("2024-01-01T00:00:00.5Z")),
            Ordering::Less
        );
    }
}
