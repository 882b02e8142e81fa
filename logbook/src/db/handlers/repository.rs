//! Generic repository over a document collection.
//!
//! A repository is the data access layer for one entity kind. It owns nothing but an
//! injected store handle, so it is cheap to construct per request:
//!
//! ```ignore
//! let accounts = Accounts::new(state.store.clone());
//! let reference = accounts.update_or_add(&account).await?;
//! ```
//!
//! The upsert is query-then-write and is not atomic. Two concurrent upserts for the same
//! key can both miss and both create; the store asserts no uniqueness constraint.

use std::{marker::PhantomData, sync::Arc};

use tracing::{debug, instrument};

use crate::db::{
    errors::Result,
    models::{Entity, Stored},
    store::{Document, DocumentRef, DocumentStore, FieldFilter},
};

pub struct Records<E> {
    store: Arc<dyn DocumentStore>,
    _kind: PhantomData<fn() -> E>,
}

impl<E> Clone for Records<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _kind: PhantomData,
        }
    }
}

impl<E: Entity> Records<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    /// Append a new document with the entity's fields. No duplicate check.
    #[instrument(skip_all, fields(collection = E::COLLECTION), err)]
    pub async fn add(&self, entity: &E) -> Result<DocumentRef> {
        let reference = self.store.add(E::COLLECTION, entity.to_fields()).await?;
        debug!(%reference, "Added document");
        Ok(reference)
    }

    #[instrument(skip_all, fields(reference = %reference), err)]
    pub async fn get(&self, reference: &DocumentRef) -> Result<Option<Stored<E>>> {
        self.store.get(reference).await?.map(Self::decode).transpose()
    }

    /// Look up the record whose unique key equals `key`.
    ///
    /// If several documents match, the first in store order wins. Kinds without a unique
    /// key never match.
    #[instrument(skip(self), fields(collection = E::COLLECTION), err)]
    pub async fn by_unique_key(&self, key: &str) -> Result<Option<Stored<E>>> {
        let Some(field) = E::UNIQUE_KEY else {
            return Ok(None);
        };
        self.first_match(&FieldFilter::eq(field, key)).await?.map(Self::decode).transpose()
    }

    /// Update the record matching the entity's unique key, or add a new one.
    ///
    /// Returns the matched document's reference on update, the new one on creation.
    #[instrument(skip_all, fields(collection = E::COLLECTION), err)]
    pub async fn update_or_add(&self, entity: &E) -> Result<DocumentRef> {
        let existing = match entity.unique_key() {
            Some(filter) => self.first_match(&filter).await?,
            None => None,
        };

        match existing {
            Some(document) => {
                debug!(reference = %document.reference, "Matching document found, replacing fields");
                self.store.update(&document.reference, entity.to_fields()).await?;
                Ok(document.reference)
            }
            None => self.add(entity).await,
        }
    }

    /// All records where `field` equals `value`, oldest first.
    #[instrument(skip(self, value), fields(collection = E::COLLECTION), err)]
    pub async fn list_where(&self, field: &str, value: &str) -> Result<Vec<Stored<E>>> {
        self.store
            .query(E::COLLECTION, &FieldFilter::eq(field, value), None)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    async fn first_match(&self, filter: &FieldFilter) -> Result<Option<Document>> {
        Ok(self.store.query(E::COLLECTION, filter, Some(1)).await?.into_iter().next())
    }

    fn decode(document: Document) -> Result<Stored<E>> {
        let entity = E::from_document(&document.reference, document.fields)?;
        Ok(Stored {
            reference: document.reference,
            entity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        errors::DbError,
        handlers::{Accounts, Entries, Labels},
        memory::MemoryDocumentStore,
        models::{accounts::Account, entries::Entry, labels::Label},
        store::Fields,
    };
    use crate::test_utils::FailingStore;
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn account(uid: &str, email: &str) -> Account {
        Account::from_fields(uid, &fields(json!({"birth": "1990-05-17", "expYears": 4, "email": email}))).unwrap()
    }

    fn setup() -> (Arc<MemoryDocumentStore>, Accounts) {
        let store = Arc::new(MemoryDocumentStore::new());
        let accounts = Accounts::new(store.clone());
        (store, accounts)
    }

    #[tokio::test]
    async fn test_update_or_add_creates_on_empty_collection() {
        let (store, accounts) = setup();
        let account = account("u1", "a@x.com");

        let reference = accounts.update_or_add(&account).await.unwrap();

        assert_eq!(store.count("users").await, 1);
        assert_eq!(reference.collection, "users");

        let found = accounts.by_unique_key("u1").await.unwrap().expect("account should exist");
        assert_eq!(found.reference, reference);
        assert_eq!(found.entity, account);
    }

    #[tokio::test]
    async fn test_update_or_add_replaces_existing_match() {
        let (store, accounts) = setup();
        let original = accounts.update_or_add(&account("u1", "a@x.com")).await.unwrap();

        let updated = account("u1", "new@x.com");
        let reference = accounts.update_or_add(&updated).await.unwrap();

        assert_eq!(reference, original);
        assert_eq!(store.count("users").await, 1);
        let found = accounts.by_unique_key("u1").await.unwrap().unwrap();
        assert_eq!(found.entity.email, "new@x.com");
        assert_eq!(found.entity, updated);
    }

    #[tokio::test]
    async fn test_update_or_add_is_idempotent() {
        let (store, accounts) = setup();
        let account = account("u1", "a@x.com");

        let first = accounts.update_or_add(&account).await.unwrap();
        let second = accounts.update_or_add(&account).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count("users").await, 1);
    }

    #[tokio::test]
    async fn test_update_or_add_keeps_other_keys_separate() {
        let (store, accounts) = setup();
        accounts.update_or_add(&account("u1", "a@x.com")).await.unwrap();
        accounts.update_or_add(&account("u2", "b@x.com")).await.unwrap();

        assert_eq!(store.count("users").await, 2);
        assert_eq!(accounts.by_unique_key("u1").await.unwrap().unwrap().entity.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_by_unique_key_not_found() {
        let (_store, accounts) = setup();
        assert!(accounts.by_unique_key("nobody").await.unwrap().is_none());
        assert!(accounts.by_unique_key("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_resolve_to_first_match() {
        let (store, accounts) = setup();
        // add() never checks for duplicates, so this seeds the anomaly directly
        let first = accounts.add(&account("u1", "first@x.com")).await.unwrap();
        let second = accounts.add(&account("u1", "second@x.com")).await.unwrap();
        assert_eq!(store.count("users").await, 2);

        let found = accounts.by_unique_key("u1").await.unwrap().unwrap();
        assert_eq!(found.reference, first);
        assert_eq!(found.entity.email, "first@x.com");

        // Upsert writes to the first match and leaves the duplicate alone
        let reference = accounts.update_or_add(&account("u1", "third@x.com")).await.unwrap();
        assert_eq!(reference, first);
        assert_eq!(accounts.get(&second).await.unwrap().unwrap().entity.email, "second@x.com");
        assert_eq!(store.count("users").await, 2);
    }

    #[tokio::test]
    async fn test_keyless_kinds_always_add() {
        let store = Arc::new(MemoryDocumentStore::new());
        let entries = Entries::new(store.clone());
        let labels = Labels::new(store.clone());

        let entry = Entry::from_fields("u1", &fields(json!({"start": "2024-06-01", "tags": ["focus"], "note": "n"}))).unwrap();
        let a = entries.update_or_add(&entry).await.unwrap();
        let b = entries.update_or_add(&entry).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count("entries").await, 2);
        assert!(entries.by_unique_key("u1").await.unwrap().is_none());

        let label = Label::from_fields("u1", &fields(json!({"name": "focus", "color": "#ff8800"}))).unwrap();
        labels.add(&label).await.unwrap();
        let listed = labels.list_where("owner", "u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entity, label);
        assert_eq!(store.count("tags").await, 1);
    }

    #[tokio::test]
    async fn test_malformed_document_is_reported() {
        let (store, accounts) = setup();
        store.add("users", fields(json!({"uid": "u1", "email": 7}))).await.unwrap();

        let err = accounts.by_unique_key("u1").await.unwrap_err();
        assert!(matches!(err, DbError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_store_unavailable_is_fatal() {
        let accounts = Accounts::new(Arc::new(FailingStore));
        let err = accounts.update_or_add(&account("u1", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, DbError::Unavailable(_)));
    }
}
