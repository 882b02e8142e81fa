//! JWT identity token verification.
//!
//! Two verifiers share one claim set and one error mapping:
//!
//! - [`JwksVerifier`] checks asymmetrically signed tokens against the provider's published
//!   key set. The key set is fetched for every verification; nothing is cached.
//! - [`SharedSecretVerifier`] checks HS256 tokens against a secret known to both sides.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header,
    errors::{Error as JwtError, ErrorKind},
    jwk::JwkSet,
};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::verifier::{AuthRejected, TokenVerifier};

/// The only claim read from a verified token. `exp`, `iss` and `aud` are checked by
/// [`Validation`] and then dropped.
#[derive(Debug, Deserialize)]
struct IdClaims {
    sub: String,
}

fn validation(algorithms: &[Algorithm], issuer: Option<&str>, audience: Option<&str>, leeway_secs: u64) -> Validation {
    let mut validation = Validation::new(algorithms.first().copied().unwrap_or(Algorithm::RS256));
    validation.algorithms = algorithms.to_vec();
    validation.leeway = leeway_secs;

    let mut required = vec!["exp", "sub"];
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
        required.push("iss");
    }
    match audience {
        Some(audience) => {
            validation.set_audience(&[audience]);
            required.push("aud");
        }
        // Tokens commonly carry an `aud`; without a configured one there is nothing to compare
        None => validation.validate_aud = false,
    }
    validation.set_required_spec_claims(&required[..]);
    validation
}

fn rejection(e: JwtError) -> AuthRejected {
    match e.kind() {
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
            AuthRejected::KeysUnavailable(format!("published key unusable: {e}"))
        }
        _ => AuthRejected::Invalid(e.to_string()),
    }
}

fn subject(claims: IdClaims) -> Result<String, AuthRejected> {
    if claims.sub.is_empty() {
        return Err(AuthRejected::Invalid("empty subject".to_string()));
    }
    Ok(claims.sub)
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct SharedSecretVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>, leeway_secs: u64) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: validation(&[Algorithm::HS256], issuer, audience, leeway_secs),
        }
    }
}

#[async_trait]
impl TokenVerifier for SharedSecretVerifier {
    #[instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<String, AuthRejected> {
        if token.is_empty() {
            return Err(AuthRejected::Missing);
        }
        let data = decode::<IdClaims>(token, &self.key, &self.validation).map_err(rejection)?;
        let uid = subject(data.claims)?;
        debug!(%uid, "Verified shared-secret token");
        Ok(uid)
    }
}

/// Verifies tokens signed by a provider that publishes its keys as a JWKS document.
pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_url: Url,
    validation: Validation,
}

impl JwksVerifier {
    pub fn new(
        jwks_url: Url,
        issuer: &str,
        audience: Option<&str>,
        algorithms: &[Algorithm],
        fetch_timeout: Duration,
        leeway_secs: u64,
    ) -> anyhow::Result<Self> {
        crate::install_crypto_provider();
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;

        Ok(Self {
            client,
            jwks_url,
            validation: validation(algorithms, Some(issuer), audience, leeway_secs),
        })
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthRejected> {
        let unavailable = |e: reqwest::Error| AuthRejected::KeysUnavailable(format!("{}: {e}", self.jwks_url));

        self.client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<JwkSet>()
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    #[instrument(skip_all, fields(jwks_url = %self.jwks_url))]
    async fn verify(&self, token: &str) -> Result<String, AuthRejected> {
        if token.is_empty() {
            return Err(AuthRejected::Missing);
        }

        let header = decode_header(token).map_err(rejection)?;
        if !self.validation.algorithms.contains(&header.alg) {
            return Err(AuthRejected::Invalid(format!("algorithm {:?} not accepted", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthRejected::Invalid("token header has no kid".to_string()))?;

        let keys = self.fetch_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| AuthRejected::Invalid(format!("kid {kid} is not in the published key set")))?;
        let key = DecodingKey::from_jwk(jwk).map_err(rejection)?;

        let data = decode::<IdClaims>(token, &key, &self.validation).map_err(rejection)?;
        let uid = subject(data.claims)?;
        debug!(%uid, %kid, "Verified provider token");
        Ok(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const PROVIDER_KEY: &str = include_str!("testdata/provider_rsa.pem");
    const PROVIDER_MODULUS: &str = include_str!("testdata/provider_rsa.n");
    const ISSUER: &str = "https://securetoken.google.com/logbook-test";
    const AUDIENCE: &str = "logbook-test";

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn claims(sub: &str, iss: &str, exp: i64) -> Value {
        json!({"sub": sub, "iss": iss, "aud": AUDIENCE, "iat": now(), "exp": exp})
    }

    fn sign_rs256(kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(PROVIDER_KEY.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    fn sign_hs256(secret: &str, claims: &Value) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn published_keys() -> Value {
        json!({
            "keys": [{
                "kty": "RSA",
                "kid": "key-1",
                "use": "sig",
                "alg": "RS256",
                "n": PROVIDER_MODULUS.trim(),
                "e": "AQAB",
            }]
        })
    }

    async fn provider() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(published_keys()))
            .mount(&server)
            .await;
        server
    }

    fn jwks_verifier(url: &str) -> JwksVerifier {
        JwksVerifier::new(
            Url::parse(url).unwrap(),
            ISSUER,
            Some(AUDIENCE),
            &[Algorithm::RS256],
            Duration::from_secs(2),
            0,
        )
        .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_jwks_accepts_token_signed_by_published_key() {
        let server = provider().await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let token = sign_rs256("key-1", &claims("user-42", ISSUER, now() + 3600));
        assert_eq!(verifier.verify(&token).await.unwrap(), "user-42");
    }

    #[tokio::test]
    async fn test_jwks_rejects_wrong_issuer() {
        let server = provider().await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let token = sign_rs256("key-1", &claims("user-42", "https://evil.example.com", now() + 3600));
        assert!(matches!(verifier.verify(&token).await, Err(AuthRejected::Invalid(_))));
    }

    #[tokio::test]
    async fn test_jwks_rejects_wrong_audience() {
        let server = provider().await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let mut claims = claims("user-42", ISSUER, now() + 3600);
        claims["aud"] = json!("some-other-project");
        let token = sign_rs256("key-1", &claims);
        assert!(matches!(verifier.verify(&token).await, Err(AuthRejected::Invalid(_))));
    }

    #[tokio::test]
    async fn test_jwks_rejects_expired_token() {
        let server = provider().await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let token = sign_rs256("key-1", &claims("user-42", ISSUER, now() - 3600));
        assert!(matches!(verifier.verify(&token).await, Err(AuthRejected::Invalid(_))));
    }

    #[tokio::test]
    async fn test_jwks_rejects_unknown_kid() {
        let server = provider().await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let token = sign_rs256("rotated-away", &claims("user-42", ISSUER, now() + 3600));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthRejected::Invalid(ref message) if message.contains("rotated-away")));
    }

    #[tokio::test]
    async fn test_jwks_rejects_hmac_token() {
        let server = provider().await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        // Signed with the public modulus as an HMAC secret: the classic algorithm confusion
        let token = sign_hs256(PROVIDER_MODULUS.trim(), &claims("user-42", ISSUER, now() + 3600));
        assert!(matches!(verifier.verify(&token).await, Err(AuthRejected::Invalid(_))));
    }

    #[tokio::test]
    async fn test_jwks_fetched_on_every_verification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(published_keys()))
            .expect(2)
            .mount(&server)
            .await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let token = sign_rs256("key-1", &claims("user-42", ISSUER, now() + 3600));
        verifier.verify(&token).await.unwrap();
        verifier.verify(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_jwks_provider_error_is_keys_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        let token = sign_rs256("key-1", &claims("user-42", ISSUER, now() + 3600));
        assert!(matches!(verifier.verify(&token).await, Err(AuthRejected::KeysUnavailable(_))));
    }

    #[tokio::test]
    async fn test_jwks_unreachable_is_keys_unavailable() {
        // Nothing listens on port 1
        let verifier = jwks_verifier("http://127.0.0.1:1/jwks.json");

        let token = sign_rs256("key-1", &claims("user-42", ISSUER, now() + 3600));
        assert!(matches!(verifier.verify(&token).await, Err(AuthRejected::KeysUnavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_tokens_are_rejected_without_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(published_keys()))
            .expect(0)
            .mount(&server)
            .await;
        let verifier = jwks_verifier(&format!("{}/jwks.json", server.uri()));

        assert!(matches!(verifier.verify("").await, Err(AuthRejected::Missing)));
        assert!(matches!(verifier.verify("abc.def.ghi").await, Err(AuthRejected::Invalid(_))));
        assert!(matches!(verifier.verify("not-a-jwt").await, Err(AuthRejected::Invalid(_))));
    }

    #[tokio::test]
    async fn test_shared_secret_round_trip() {
        let verifier = SharedSecretVerifier::new("s3cret", Some(ISSUER), None, 0);

        let token = sign_hs256("s3cret", &claims("user-42", ISSUER, now() + 3600));
        assert_eq!(verifier.verify(&token).await.unwrap(), "user-42");
    }

    #[tokio::test]
    async fn test_shared_secret_rejections() {
        let verifier = SharedSecretVerifier::new("s3cret", Some(ISSUER), Some(AUDIENCE), 0);

        let wrong_secret = sign_hs256("other", &claims("user-42", ISSUER, now() + 3600));
        assert!(matches!(verifier.verify(&wrong_secret).await, Err(AuthRejected::Invalid(_))));

        let expired = sign_hs256("s3cret", &claims("user-42", ISSUER, now() - 3600));
        assert!(matches!(verifier.verify(&expired).await, Err(AuthRejected::Invalid(_))));

        let wrong_issuer = sign_hs256("s3cret", &claims("user-42", "https://elsewhere", now() + 3600));
        assert!(matches!(verifier.verify(&wrong_issuer).await, Err(AuthRejected::Invalid(_))));

        let empty_subject = sign_hs256("s3cret", &claims("", ISSUER, now() + 3600));
        assert!(matches!(verifier.verify(&empty_subject).await, Err(AuthRejected::Invalid(_))));

        let no_subject = sign_hs256("s3cret", &json!({"iss": ISSUER, "aud": AUDIENCE, "exp": now() + 3600}));
        assert!(matches!(verifier.verify(&no_subject).await, Err(AuthRejected::Invalid(_))));
    }
}
