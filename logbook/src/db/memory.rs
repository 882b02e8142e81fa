//! In-process document store.
//!
//! Keeps every collection as an insertion-ordered `Vec` behind a `tokio` lock. Nothing is
//! persisted; used for `database.type: memory` and by the test suites.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    store::{Document, DocumentRef, DocumentStore, FieldFilter, Fields},
};

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    #[cfg(test)]
    pub(crate) async fn count(&self, collection: &str) -> usize {
        self.collections.read().await.get(collection).map_or(0, Vec::len)
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    #[instrument(skip(self, fields), err)]
    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentRef> {
        let reference = DocumentRef::new(collection, Uuid::new_v4());
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                reference: reference.clone(),
                fields,
            });
        Ok(reference)
    }

    #[instrument(skip(self, filter), fields(field = %filter.field), err)]
    async fn query(&self, collection: &str, filter: &FieldFilter, limit: Option<usize>) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(documents
            .iter()
            .filter(|d| filter.matches(&d.fields))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    #[instrument(skip(self), fields(reference = %reference), err)]
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&reference.collection)
            .and_then(|docs| docs.iter().find(|d| d.reference.id == reference.id))
            .cloned())
    }

    #[instrument(skip(self, fields), fields(reference = %reference), err)]
    async fn update(&self, reference: &DocumentRef, fields: Fields) -> Result<()> {
        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(&reference.collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.reference.id == reference.id))
            .ok_or(DbError::NotFound)?;
        document.fields = fields;
        Ok(())
    }
}
