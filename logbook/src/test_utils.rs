//! Test fixtures: an in-memory application behind a fixed token table.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum_test::TestServer;

use crate::{
    AppState,
    auth::{AuthRejected, TokenVerifier},
    config::Config,
    db::{
        errors::{DbError, Result},
        memory::MemoryDocumentStore,
        store::{Document, DocumentRef, DocumentStore, FieldFilter, Fields},
    },
};

pub const U1_TOKEN: &str = "token-u1";
pub const U2_TOKEN: &str = "token-u2";

/// Verifier that knows a handful of tokens and rejects everything else.
pub struct StaticVerifier {
    tokens: HashMap<String, String>,
}

impl StaticVerifier {
    pub fn new<'a>(tokens: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|(t, uid)| (t.to_string(), uid.to_string())).collect(),
        }
    }
}

impl Default for StaticVerifier {
    fn default() -> Self {
        Self::new([("abc.def.ghi", "user-42"), (U1_TOKEN, "u1"), (U2_TOKEN, "u2")])
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> std::result::Result<String, AuthRejected> {
        if token.is_empty() {
            return Err(AuthRejected::Missing);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthRejected::Invalid("unknown test token".to_string()))
    }
}

/// Store whose every operation fails as if the database were down.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn add(&self, _collection: &str, _fields: Fields) -> Result<DocumentRef> {
        Err(DbError::Unavailable("connection refused".to_string()))
    }
    async fn query(&self, _collection: &str, _filter: &FieldFilter, _limit: Option<usize>) -> Result<Vec<Document>> {
        Err(DbError::Unavailable("connection refused".to_string()))
    }
    async fn get(&self, _reference: &DocumentRef) -> Result<Option<Document>> {
        Err(DbError::Unavailable("connection refused".to_string()))
    }
    async fn update(&self, _reference: &DocumentRef, _fields: Fields) -> Result<()> {
        Err(DbError::Unavailable("connection refused".to_string()))
    }
}

pub fn create_test_state(store: Arc<dyn DocumentStore>) -> AppState {
    AppState::builder()
        .store(store)
        .verifier(Arc::new(StaticVerifier::default()))
        .config(Config::default())
        .build()
}

pub fn create_test_app_with_store(store: Arc<dyn DocumentStore>) -> TestServer {
    let router = crate::build_router(create_test_state(store)).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Test server over a fresh in-memory store, returned alongside the store for inspection.
pub fn create_test_app() -> (TestServer, Arc<MemoryDocumentStore>) {
    let store = Arc::new(MemoryDocumentStore::new());
    (create_test_app_with_store(store.clone()), store)
}
