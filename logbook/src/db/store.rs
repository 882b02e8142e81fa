//! Document store abstraction.
//!
//! The repositories never talk to a concrete backend. They are handed an
//! `Arc<dyn DocumentStore>` at construction time and only use the four primitives
//! defined here: add a document, query a collection by field equality, fetch a document
//! by reference, and replace a document's fields by reference.
//!
//! Two backends ship with the crate:
//!
//! - [`crate::db::postgres::PgDocumentStore`]: a single JSONB `documents` table
//! - [`crate::db::memory::MemoryDocumentStore`]: process-local, used for development and tests

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::errors::Result;

/// Raw field mapping of a document, keyed by wire field name.
pub type Fields = Map<String, Value>;

/// Opaque, store-assigned address of a document.
///
/// Rendered as `<collection>/<id>`, e.g. `users/550e8400-e29b-41d4-a716-446655440000`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub id: Uuid,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: Uuid) -> Self {
        Self {
            collection: collection.into(),
            id,
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub reference: DocumentRef,
    pub fields: Fields,
}

/// Equality filter on a single top-level field.
///
/// Equality follows JSONB `=`: values must have the same JSON type, and numbers compare
/// by value, so `4` matches `4.0` while `"4"` does not.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document's fields satisfy this filter. A missing field never matches.
    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field).is_some_and(|v| json_eq(v, &self.value))
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Primitive operations every document store backend provides.
///
/// Query results are returned in insertion order, so "the first match" is deterministic
/// for a given store state.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a new document to `collection`. Never checks for duplicates.
    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentRef>;

    /// Documents in `collection` whose field equals the filter value, oldest first,
    /// truncated to `limit` when given. Equality is [`FieldFilter::matches`] on every
    /// backend.
    async fn query(&self, collection: &str, filter: &FieldFilter, limit: Option<usize>) -> Result<Vec<Document>>;

    /// Point lookup by reference.
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Document>>;

    /// Replace all fields of an existing document. Fails with `DbError::NotFound` if the
    /// reference does not resolve.
    async fn update(&self, reference: &DocumentRef, fields: Fields) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_ref_display() {
        let id = Uuid::nil();
        let reference = DocumentRef::new("users", id);
        assert_eq!(reference.to_string(), "users/00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_field_filter_matches_exact_value_only() {
        let fields: Fields = json!({"uid": "u1", "expYears": 3}).as_object().cloned().unwrap();

        assert!(FieldFilter::eq("uid", "u1").matches(&fields));
        assert!(!FieldFilter::eq("uid", "u2").matches(&fields));
        // Type matters: "3" is not 3
        assert!(!FieldFilter::eq("expYears", "3").matches(&fields));
        assert!(FieldFilter::eq("expYears", 3).matches(&fields));
        assert!(!FieldFilter::eq("email", "").matches(&fields));
    }

    #[test]
    fn test_field_filter_compares_numbers_by_value() {
        let fields: Fields = json!({"expYears": 4, "score": 2.5}).as_object().cloned().unwrap();

        assert!(FieldFilter::eq("expYears", 4.0).matches(&fields));
        assert!(!FieldFilter::eq("expYears", 4.5).matches(&fields));
        assert!(FieldFilter::eq("score", 2.5).matches(&fields));
        assert!(!FieldFilter::eq("score", 2).matches(&fields));
    }
}
