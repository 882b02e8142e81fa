//! Axum route handlers.
//!
//! Handlers build a repository over the injected store per request; there is no other
//! shared state.

pub mod accounts;
pub mod auth;
pub mod entries;
pub mod labels;
