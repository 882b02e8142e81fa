//! # logbook: identity-gated accounts, activity entries and labels
//!
//! `logbook` is a small HTTP service that keeps one account per identity-provider subject,
//! plus the activity entries and labels that account owns. Callers prove who they are with
//! an identity token issued by an external provider (Firebase, any JWKS-publishing issuer,
//! or a shared HS256 secret); the service never manages credentials itself.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Persistence goes through a
//! [`db::store::DocumentStore`]: named collections of JSON documents with field-equality
//! queries. PostgreSQL (one JSONB table, migrations embedded) is used in production and a
//! process-local store in development and tests.
//!
//! - **API** ([`api`]): route handlers and request/response bodies
//! - **Authentication** ([`auth`]): token verifiers and the [`auth::VerifiedUser`] extractor
//! - **Persistence** ([`db`]): the store trait, its backends, record kinds and repositories
//! - **Secrets** ([`secrets`]): environment-or-file secret lookup, resolved at startup
//!
//! Accounts are upserted by `uid`: the repository looks for an existing document with the
//! same key and overwrites it, or adds a new one. The lookup and the write are separate
//! store calls, so two concurrent first saves for one uid can both create.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use logbook::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = logbook::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     logbook::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     Application::new(config).await?.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod secrets;
pub mod telemetry;
#[cfg(test)]
mod test_utils;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;

pub use config::Config;

use crate::{
    api::openapi::ApiDoc,
    auth::TokenVerifier,
    config::{CorsOrigin, DatabaseConfig, PoolSettings},
    db::{memory::MemoryDocumentStore, postgres::PgDocumentStore, store::DocumentStore},
    secrets::{EnvOrFileSecrets, Secrets},
};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .store(Arc::new(MemoryDocumentStore::new()))
///     .verifier(verifier)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub config: Config,
}

/// Get the logbook database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Install the process-wide rustls provider used by outbound HTTPS clients.
///
/// Safe to call more than once; later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let optional = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(optional(settings.idle_timeout_secs))
        .max_lifetime(optional(settings.max_lifetime_secs))
}

/// Connect the configured document store, running migrations for PostgreSQL.
///
/// Returns the pool alongside the store so it can be closed on shutdown.
#[instrument(skip_all)]
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn DocumentStore>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Memory => {
            info!("Using in-memory document store; data does not survive a restart");
            Ok((Arc::new(MemoryDocumentStore::new()), None))
        }
        DatabaseConfig::External { url, pool } => {
            info!("Using external database");
            let pool = pool_options(pool).connect(url).await.context("connect to database")?;
            migrator().run(&pool).await.context("run database migrations")?;
            Ok((Arc::new(PgDocumentStore::new(pool.clone())), Some(pool)))
        }
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a path; Url renders a bare origin with a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;

    let api_routes = Router::new()
        .route("/verified_id_token", get(api::handlers::auth::verified_id_token))
        .route(
            "/accounts/current",
            get(api::handlers::accounts::get_current_account).put(api::handlers::accounts::upsert_current_account),
        )
        .route(
            "/entries",
            get(api::handlers::entries::list_entries).post(api::handlers::entries::create_entry),
        )
        .route(
            "/labels",
            get(api::handlers::labels::list_labels).post(api::handlers::labels::create_label),
        )
        .with_state(state);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(api_routes)
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// A configured, ready-to-serve instance.
///
/// [`Application::new`] resolves secrets, connects the store and builds the verifier;
/// any failure there aborts startup. [`Application::serve`] runs until the shutdown future
/// resolves, then closes the pool and flushes telemetry.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting logbook with configuration: {:#?}", config);

        let lookup = EnvOrFileSecrets::from_config(&config.secrets);
        let secrets = Secrets::resolve(&lookup, config.required_secrets()).context("resolve required secrets")?;

        let (store, pool) = setup_store(&config).await?;
        let verifier = auth::build_verifier(&config.identity, &secrets)?;

        let state = AppState::builder()
            .store(store)
            .verifier(verifier)
            .config(config.clone())
            .build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "logbook listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorsConfig, IdentityProviderConfig};
    use axum::http::StatusCode;
    use figment::Jail;

    fn config_with_secret_dir(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.secrets.dir = dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_startup_fails_without_required_secret() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_secret_dir(dir.path());
        config.secrets.required = vec!["GITHUB_CLIENT_ID".to_string()];
        std::fs::write(dir.path().join("token_signing_secret"), "s3cret").unwrap();

        let err = Application::new(config).await.err().expect("startup should fail");
        assert!(format!("{err:#}").contains("GITHUB_CLIENT_ID"));
    }

    #[test_log::test(tokio::test)]
    async fn test_application_serves_health_and_openapi() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token_signing_secret"), "s3cret\n").unwrap();
        let app = Application::new(config_with_secret_dir(dir.path())).await.unwrap();
        let server = app.into_test_server();

        server.get("/healthz").await.assert_text("OK");

        let doc: serde_json::Value = server.get("/openapi.json").await.json();
        assert!(doc["paths"]["/accounts/current"]["put"].is_object());

        server.get("/verified_id_token").add_query_param("id_token", "").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_shared_secret_tokens_authenticate_end_to_end() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("signing_key"), "s3cret").unwrap();
        let mut config = config_with_secret_dir(dir.path());
        config.identity.provider = IdentityProviderConfig::SharedSecret {
            secret_name: "SIGNING_KEY".to_string(),
            issuer: None,
            audience: None,
        };
        let server = Application::new(config).await.unwrap().into_test_server();

        let claims = serde_json::json!({"sub": "u1", "exp": chrono::Utc::now().timestamp() + 600});
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap();

        let response = server.get("/verified_id_token").add_query_param("id_token", &token).await;
        response.assert_status_ok();
        response.assert_text("u1");
    }

    #[test]
    fn test_managed_environment_secret_comes_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("LOGBOOK_ENV", "FLY");
            jail.set_env("TOKEN_SIGNING_SECRET", "from-env");
            let config = Config::default();

            let lookup = EnvOrFileSecrets::from_config(&config.secrets);
            let secrets = Secrets::resolve(&lookup, config.required_secrets()).unwrap();
            assert_eq!(secrets.get("TOKEN_SIGNING_SECRET").unwrap(), "from-env");
            Ok(())
        });
    }

    #[tokio::test]
    async fn test_cors_preflight_with_explicit_origin() {
        let mut config = Config::default();
        config.cors = CorsConfig {
            allowed_origins: vec![CorsOrigin::Url("https://app.example.com".parse().unwrap())],
            allow_credentials: true,
            max_age: None,
        };
        let state = crate::test_utils::create_test_state(Arc::new(MemoryDocumentStore::new()));
        let state = AppState { config, ..state };
        let server = axum_test::TestServer::new(build_router(state).unwrap()).unwrap();

        let response = server
            .method(Method::OPTIONS, "/accounts/current")
            .add_header("origin", "https://app.example.com")
            .add_header("access-control-request-method", "PUT")
            .await;

        assert_eq!(
            response.header("access-control-allow-origin").to_str().unwrap(),
            "https://app.example.com"
        );
    }
}
