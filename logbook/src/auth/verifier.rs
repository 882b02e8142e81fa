use async_trait::async_trait;
use thiserror::Error;

/// Why a token was refused. Callers see a single 401 regardless of the variant.
#[derive(Error, Debug)]
pub enum AuthRejected {
    #[error("no id token presented")]
    Missing,

    #[error("token rejected: {0}")]
    Invalid(String),

    /// The provider's signing keys could not be fetched or used
    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),

    #[error("uid {presented} does not match the session token")]
    UidMismatch { presented: String },
}

/// Turns an identity token into the subject it was issued for.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<String, AuthRejected>;
}
