//! Persistence layer.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - upsert policy, decoding)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │DocumentStore│  (db::store - add / query / get / update)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ PostgreSQL  │  (or the in-memory store)
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: the document store trait and its value types
//! - [`postgres`], [`memory`]: store backends
//! - [`models`]: record kinds and their factories
//! - [`handlers`]: repositories
//! - [`errors`]: store error type

pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;
