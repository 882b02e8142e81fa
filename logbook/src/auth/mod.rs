//! Identity token verification.
//!
//! Every request that acts on behalf of a user carries an `id_token` query parameter issued
//! by an external identity provider. A [`TokenVerifier`] turns the token into the subject
//! (`uid`) it was issued for; the [`VerifiedUser`] extractor runs it for each request.
//!
//! Which verifier runs is decided by `identity.provider`:
//!
//! - `firebase`: Google Secure Token ID tokens for one project ([`jwt::JwksVerifier`])
//! - `jwks`: any provider publishing a JWKS document ([`jwt::JwksVerifier`])
//! - `shared_secret`: HS256 tokens signed with a named secret ([`jwt::SharedSecretVerifier`])
//!
//! Rejections of any kind surface to the caller as one undifferentiated `401`.

pub mod extract;
pub mod jwt;
pub mod verifier;

use std::sync::Arc;

use tracing::info;

pub use extract::{SessionQuery, VerifiedUser};
pub use verifier::{AuthRejected, TokenVerifier};

use crate::{
    config::{IdentityConfig, IdentityProviderConfig},
    secrets::Secrets,
};

/// Build the verifier selected by the identity configuration.
///
/// Shared-secret providers read their secret from `secrets`, which must already hold it.
pub fn build_verifier(identity: &IdentityConfig, secrets: &Secrets) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    let verifier: Arc<dyn TokenVerifier> = match identity.provider.resolved()? {
        IdentityProviderConfig::Jwks {
            jwks_url,
            issuer,
            audience,
            algorithms,
        } => {
            info!(%jwks_url, %issuer, "Verifying identity tokens against published keys");
            Arc::new(jwt::JwksVerifier::new(
                jwks_url,
                &issuer,
                audience.as_deref(),
                &algorithms,
                identity.fetch_timeout,
                identity.leeway_secs,
            )?)
        }
        IdentityProviderConfig::SharedSecret {
            secret_name,
            issuer,
            audience,
        } => {
            info!(%secret_name, "Verifying identity tokens with a shared secret");
            let secret = secrets.get(&secret_name)?;
            Arc::new(jwt::SharedSecretVerifier::new(
                secret,
                issuer.as_deref(),
                audience.as_deref(),
                identity.leeway_secs,
            ))
        }
        // resolved() expands the Firebase profile
        IdentityProviderConfig::Firebase { .. } => anyhow::bail!("identity provider profile was not resolved"),
    };
    Ok(verifier)
}
