//! Secret lookup by name.
//!
//! In a managed hosting environment (the deployment variable, `LOGBOOK_ENV` by default,
//! names one of `secrets.managed_environments`) a secret set in the process environment
//! wins. Everywhere else, and for names the environment does not carry, the secret is
//! the first line of `<secrets.dir>/<name in lowercase>`.
//!
//! Every name in `secrets.required` is resolved once at startup; a failure aborts the
//! process before it starts serving.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SecretsConfig;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("secret {name}: cannot read {}: {source}", .path.display())]
    Unreadable {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret {name}: {} is empty", .path.display())]
    Empty { name: String, path: PathBuf },

    #[error("secret {0} was not resolved at startup")]
    Unresolved(String),
}

/// Resolves secret values by name.
pub trait SecretLookup: Send + Sync {
    fn get(&self, name: &str) -> Result<String, SecretError>;
}

/// Environment-or-file lookup.
#[derive(Debug, Clone)]
pub struct EnvOrFileSecrets {
    managed: bool,
    dir: PathBuf,
}

impl EnvOrFileSecrets {
    pub fn new(managed: bool, dir: impl Into<PathBuf>) -> Self {
        Self { managed, dir: dir.into() }
    }

    /// Decide managed vs local from the deployment variable named in the config.
    pub fn from_config(config: &SecretsConfig) -> Self {
        let environment = std::env::var(&config.env_var).ok();
        let managed = environment
            .as_deref()
            .is_some_and(|env| config.managed_environments.iter().any(|m| m == env));
        debug!(env_var = %config.env_var, ?environment, managed, "Secret lookup mode");
        Self::new(managed, &config.dir)
    }

    pub fn is_managed(&self) -> bool {
        self.managed
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name.to_lowercase())
    }
}

impl SecretLookup for EnvOrFileSecrets {
    fn get(&self, name: &str) -> Result<String, SecretError> {
        if self.managed
            && let Ok(value) = std::env::var(name)
        {
            return Ok(value);
        }

        let path = self.path_for(name);
        read_first_line(name, &path)
    }
}

fn read_first_line(name: &str, path: &Path) -> Result<String, SecretError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SecretError::Unreadable {
        name: name.to_string(),
        path: path.to_path_buf(),
        source,
    })?;

    match contents.lines().next() {
        Some(line) if !line.is_empty() => Ok(line.to_string()),
        _ => Err(SecretError::Empty {
            name: name.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

/// Secrets resolved once at startup.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    /// Resolve every name, failing on the first one that cannot be read.
    pub fn resolve<'a>(lookup: &dyn SecretLookup, names: impl IntoIterator<Item = &'a str>) -> Result<Self, SecretError> {
        let mut values = HashMap::new();
        for name in names {
            let value = lookup.get(name)?;
            values.insert(name.to_string(), value);
        }
        info!(count = values.len(), "Resolved secrets");
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Result<&str, SecretError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SecretError::Unresolved(name.to_string()))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Secrets").field("names", &names).finish_non_exhaustive()
    }
}
