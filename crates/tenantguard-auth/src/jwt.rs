//! JWT bearer token verification.
//!
//! The resolver only depends on the [`JwtVerifier`] capability. [`JwksVerifier`]
//! is the bundled implementation that validates tokens against a remote JSON
//! Web Key Set; deployments may inject any other implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tenantguard_core::JwtConfig;
use tracing::{debug, info, warn};

/// Largest key set response accepted, in bytes.
const MAX_JWKS_BYTES: usize = 512 * 1024;

/// Leeway applied to `exp` and `nbf`, in seconds.
const CLAIM_LEEWAY_SECS: u64 = 30;

/// The identity asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// The `sub` claim.
    pub subject: String,
    /// The `email` claim, when present.
    pub email: Option<String>,
}

/// Errors raised while verifying a JWT.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The token is not a structurally valid JWT.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The header names an algorithm outside the allow-list.
    #[error("algorithm {0} not allowed")]
    UnsupportedAlgorithm(String),

    /// No key in the key set matches the token's `kid`.
    #[error("signing key not found: {0}")]
    KeyNotFound(String),

    /// The key set could not be fetched or parsed.
    #[error("key set unavailable: {0}")]
    KeySet(String),

    /// Signature or claim validation failed.
    #[error("validation failed: {0}")]
    Invalid(String),
}

/// Capability to verify a bearer token and return its subject.
#[async_trait]
pub trait JwtVerifier: Send + Sync {
    /// Verify `token` and return the identity it asserts.
    ///
    /// # Errors
    ///
    /// Returns a [`JwtError`] describing why the token was rejected.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, JwtError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
    crv: Option<String>,
    x: Option<String>,
    y: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Verifies RS256 and ES256 tokens against a remote JSON Web Key Set.
///
/// Keys are cached by `kid`; an unknown `kid` triggers one refetch of the key
/// set. The HTTP client has a hard timeout and does not follow redirects.
#[derive(Clone)]
pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_url: String,
    issuer: Option<String>,
    audience: Vec<String>,
    keys: Arc<DashMap<String, Arc<DecodingKey>>>,
}

impl std::fmt::Debug for JwksVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksVerifier")
            .field("jwks_url", &self.jwks_url)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("cached_keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl JwksVerifier {
    /// Create a verifier from JWT settings.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::KeySet`] if the HTTP client cannot be built.
    pub fn new(config: &JwtConfig) -> Result<Self, JwtError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("tenantguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JwtError::KeySet(e.to_string()))?;

        Ok(Self {
            client,
            jwks_url: config.jwks_url.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            keys: Arc::new(DashMap::new()),
        })
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, JwtError> {
        if let Some(key) = self.keys.get(kid) {
            return Ok(Arc::clone(key.value()));
        }

        self.refresh().await?;

        self.keys
            .get(kid)
            .map(|key| Arc::clone(key.value()))
            .ok_or_else(|| JwtError::KeyNotFound(kid.to_owned()))
    }

    async fn refresh(&self) -> Result<(), JwtError> {
        info!(uri = %self.jwks_url, "refreshing JSON web key set");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| JwtError::KeySet(e.to_string()))?;

        if response
            .content_length()
            .is_some_and(|len| len > MAX_JWKS_BYTES as u64)
        {
            return Err(JwtError::KeySet("key set response too large".to_owned()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JwtError::KeySet(e.to_string()))?;
        if body.len() > MAX_JWKS_BYTES {
            return Err(JwtError::KeySet("key set response too large".to_owned()));
        }

        let set: JwkSet =
            serde_json::from_slice(&body).map_err(|e| JwtError::KeySet(e.to_string()))?;

        self.keys.clear();
        for jwk in set.keys {
            let Some(kid) = jwk.kid.clone() else {
                continue;
            };
            match decoding_key(&jwk) {
                Some(key) => {
                    self.keys.insert(kid, Arc::new(key));
                }
                None => debug!(kid, kty = %jwk.kty, "skipping unsupported key"),
            }
        }

        Ok(())
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = CLAIM_LEEWAY_SECS;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if !self.audience.is_empty() {
            validation.set_audience(&self.audience);
        }
        validation
    }
}

#[async_trait]
impl JwtVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, JwtError> {
        let header = decode_header(token).map_err(|e| JwtError::Malformed(e.to_string()))?;

        match header.alg {
            Algorithm::RS256 | Algorithm::ES256 => {}
            other => return Err(JwtError::UnsupportedAlgorithm(format!("{other:?}"))),
        }

        let kid = header
            .kid
            .ok_or_else(|| JwtError::Malformed("missing kid".to_owned()))?;
        let key = self.key_for(&kid).await?;

        let data = decode::<Claims>(token, &key, &self.validation(header.alg)).map_err(|e| {
            warn!(kid, error = %e, "JWT validation failed");
            JwtError::Invalid(e.to_string())
        })?;

        Ok(VerifiedToken {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Build a decoding key from an RSA or P-256 EC key set entry.
fn decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    match jwk.kty.as_str() {
        "RSA" => {
            let (n, e) = (jwk.n.as_deref()?, jwk.e.as_deref()?);
            DecodingKey::from_rsa_components(n, e).ok()
        }
        "EC" if jwk.crv.as_deref() == Some("P-256") => {
            let (x, y) = (jwk.x.as_deref()?, jwk.y.as_deref()?);
            DecodingKey::from_ec_components(x, y).ok()
        }
        _ => None,
    }
}
