//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The
//! configuration file path defaults to `config.yaml` but can be specified via `-f` flag or
//! `LOGBOOK_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `LOGBOOK_` override YAML values
//! 3. **DATABASE_URL** - Special case: switches `database` to an external PostgreSQL store
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `LOGBOOK_IDENTITY__PROVIDER__PROJECT_ID=my-project` sets `identity.provider.project_id`.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`
//! - **Database**: `database.type` (`memory` or `external`), `database.url`, `database.pool`
//! - **Identity**: `identity.provider` - how caller tokens are verified
//! - **Secrets**: `secrets.dir`, `secrets.required` - startup secret resolution
//! - **CORS**: `cors.allowed_origins`
//! - **Telemetry**: `enable_otel_export`
//!
//! ## Example
//!
//! ```yaml
//! port: 3001
//! database:
//!   type: external
//!   url: postgres://localhost:5432/logbook
//! identity:
//!   provider:
//!     type: firebase
//!     project_id: my-project
//! secrets:
//!   required: [GITHUB_CLIENT_ID, GITHUB_CLIENT_SECRET]
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// JWKS published by Google for Firebase / Secure Token ID tokens.
pub const FIREBASE_JWKS_URL: &str = "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "LOGBOOK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty file (or no file) is a valid starting point.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Set from `DATABASE_URL`; replaces `database` with an external store when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Document store backend
    pub database: DatabaseConfig,
    /// Token verification
    pub identity: IdentityConfig,
    /// Secret lookup
    pub secrets: SecretsConfig,
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_url: None,
            database: DatabaseConfig::default(),
            identity: IdentityConfig::default(),
            secrets: SecretsConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

/// Connection pool settings for the PostgreSQL store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// Process-local store; everything is lost on shutdown
    #[default]
    Memory,
    /// External PostgreSQL database
    External {
        /// Connection string
        url: String,
        #[serde(default)]
        pool: PoolSettings,
    },
}

impl DatabaseConfig {
    pub fn external_url(&self) -> Option<&str> {
        match self {
            DatabaseConfig::External { url, .. } => Some(url),
            DatabaseConfig::Memory => None,
        }
    }
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub provider: IdentityProviderConfig,
    /// Timeout for fetching the provider's signing keys
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
    /// Clock skew tolerated on `exp`/`nbf`, in seconds
    pub leeway_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider: IdentityProviderConfig::default(),
            fetch_timeout: Duration::from_secs(10),
            leeway_secs: 60,
        }
    }
}

/// How identity tokens are verified.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityProviderConfig {
    /// Firebase / Google Secure Token ID tokens for a project
    Firebase { project_id: String },
    /// Asymmetrically signed tokens checked against a JWKS endpoint
    Jwks {
        jwks_url: Url,
        issuer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audience: Option<String>,
        #[serde(default = "default_jwks_algorithms")]
        algorithms: Vec<Algorithm>,
    },
    /// HS256 tokens signed with a shared secret resolved by name
    SharedSecret {
        secret_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issuer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audience: Option<String>,
    },
}

fn default_jwks_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

impl Default for IdentityProviderConfig {
    fn default() -> Self {
        IdentityProviderConfig::SharedSecret {
            secret_name: "TOKEN_SIGNING_SECRET".to_string(),
            issuer: None,
            audience: None,
        }
    }
}

impl IdentityProviderConfig {
    /// Expand profile variants into the JWKS settings they stand for.
    pub fn resolved(&self) -> Result<IdentityProviderConfig, Error> {
        match self {
            IdentityProviderConfig::Firebase { project_id } => Ok(IdentityProviderConfig::Jwks {
                jwks_url: Url::parse(FIREBASE_JWKS_URL).map_err(|e| Error::Internal {
                    operation: format!("parse Firebase JWKS URL: {e}"),
                })?,
                issuer: format!("{FIREBASE_ISSUER_PREFIX}{project_id}"),
                audience: Some(project_id.clone()),
                algorithms: default_jwks_algorithms(),
            }),
            other => Ok(other.clone()),
        }
    }

    /// Secret this provider needs resolved at startup, if any.
    pub fn secret_name(&self) -> Option<&str> {
        match self {
            IdentityProviderConfig::SharedSecret { secret_name, .. } => Some(secret_name),
            _ => None,
        }
    }
}

/// Secret lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Environment variable naming the deployment environment
    pub env_var: String,
    /// Deployment environments in which secrets are read from the process environment
    pub managed_environments: Vec<String>,
    /// Directory holding one file per secret, named by the lowercased secret name
    pub dir: PathBuf,
    /// Secrets that must resolve before the server starts
    pub required: Vec<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            env_var: "LOGBOOK_ENV".to_string(),
            managed_environments: vec!["FLY".to_string(), "AZURE_FUNCTION".to_string()],
            dir: PathBuf::from(".secrets"),
            required: Vec::new(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600),
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over whatever the file says, keeping configured pool settings
        if let Some(url) = config.database_url.take() {
            let pool = match &config.database {
                DatabaseConfig::External { pool, .. } => pool.clone(),
                DatabaseConfig::Memory => PoolSettings::default(),
            };
            config.database = DatabaseConfig::External { url, pool };
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        match &self.identity.provider {
            IdentityProviderConfig::Firebase { project_id } if project_id.trim().is_empty() => {
                return Err(Error::Internal {
                    operation: "Config validation: identity.provider.project_id cannot be empty".to_string(),
                });
            }
            IdentityProviderConfig::Jwks { issuer, algorithms, .. } => {
                if issuer.trim().is_empty() {
                    return Err(Error::Internal {
                        operation: "Config validation: identity.provider.issuer cannot be empty".to_string(),
                    });
                }
                if algorithms.is_empty() {
                    return Err(Error::Internal {
                        operation: "Config validation: identity.provider.algorithms must list at least one algorithm".to_string(),
                    });
                }
                if algorithms.iter().any(|a| matches!(a, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) {
                    return Err(Error::Internal {
                        operation: "Config validation: JWKS providers only accept asymmetric algorithms; use type: shared_secret for HMAC"
                            .to_string(),
                    });
                }
            }
            IdentityProviderConfig::SharedSecret { secret_name, .. } if secret_name.trim().is_empty() => {
                return Err(Error::Internal {
                    operation: "Config validation: identity.provider.secret_name cannot be empty".to_string(),
                });
            }
            _ => {}
        }

        if self.identity.fetch_timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: identity.fetch_timeout must be greater than zero".to_string(),
            });
        }

        if let DatabaseConfig::External { url, .. } = &self.database
            && url.trim().is_empty()
        {
            return Err(Error::Internal {
                operation: "Config validation: database.url cannot be empty for an external database".to_string(),
            });
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Every secret that must resolve at startup: the configured list plus whatever the
    /// identity provider needs.
    pub fn required_secrets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.secrets.required.iter().map(String::as_str).collect();
        if let Some(name) = self.identity.provider.secret_name()
            && !names.contains(&name)
        {
            names.push(name);
        }
        names
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("LOGBOOK_").ignore(&["CONFIG", "ENV"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
