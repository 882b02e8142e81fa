//! HTTP surface.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response bodies
//!
//! Every route except `/healthz` and `/openapi.json` identifies the caller from the
//! `id_token` query parameter (see [`crate::auth`]). The document is served at
//! `/openapi.json`, built from [`openapi::ApiDoc`].

pub mod handlers;
pub mod models;
pub mod openapi;
