//! Client-side request signing.
//!
//! [`RequestSigner`] produces the four signing headers for a request and the
//! exact body bytes that were hashed, so callers send what was signed.

use rand::RngExt;
use serde::Serialize;

use crate::canonical::build_canonical_message;
use crate::clock::{Clock, SystemClock};
use crate::replay::SUPPORTED_ALGORITHM;
use crate::signature::sign;

/// Default nonce size in random bytes (32 hex characters).
pub const DEFAULT_NONCE_BYTES: usize = 16;

/// Header carrying the base64 signature.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Header carrying the signature algorithm.
pub const SIGNATURE_ALG_HEADER: &str = "x-signature-alg";
/// Header carrying the epoch-millisecond timestamp.
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
/// Header carrying the nonce.
pub const NONCE_HEADER: &str = "x-nonce";

/// Generate a nonce of `bytes` random bytes, hex-encoded.
///
/// # Examples
///
/// ```
/// use tenantguard_auth::signer::generate_nonce;
///
/// let nonce = generate_nonce(16);
/// assert_eq!(nonce.len(), 32);
/// assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn generate_nonce(bytes: usize) -> String {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; bytes];
    rng.fill(buf.as_mut_slice());
    hex::encode(buf)
}

/// Headers and body of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Base64 HMAC-SHA256 signature.
    pub signature: String,
    /// Signature algorithm, always `sha256`.
    pub algorithm: &'static str,
    /// Epoch-millisecond timestamp as sent.
    pub timestamp: String,
    /// Nonce as sent.
    pub nonce: String,
    /// The body bytes that were signed.
    pub body: Vec<u8>,
}

impl SignedRequest {
    /// The signing headers as `(name, value)` pairs.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, &str); 4] {
        [
            (SIGNATURE_HEADER, self.signature.as_str()),
            (SIGNATURE_ALG_HEADER, self.algorithm),
            (TIMESTAMP_HEADER, self.timestamp.as_str()),
            (NONCE_HEADER, self.nonce.as_str()),
        ]
    }
}

/// Signs outgoing requests with a shared secret.
#[derive(Clone)]
pub struct RequestSigner {
    key: Vec<u8>,
    clock: std::sync::Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key", &"...")
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer for `key`.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            clock: std::sync::Arc::new(SystemClock),
        }
    }

    /// Use `clock` for request timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: std::sync::Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sign a request with a fresh nonce and the current time.
    #[must_use]
    pub fn sign(&self, method: &str, path: &str, body: &[u8]) -> SignedRequest {
        self.sign_with(
            method,
            path,
            body,
            &generate_nonce(DEFAULT_NONCE_BYTES),
            self.clock.now_millis(),
        )
    }

    /// Sign a request with a JSON body, or an empty body for `None`.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if `body` cannot be encoded.
    pub fn sign_json<T: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: Option<&T>,
    ) -> Result<SignedRequest, serde_json::Error> {
        let bytes = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };
        Ok(self.sign(method, path, &bytes))
    }

    /// Sign a request with an explicit nonce and timestamp.
    #[must_use]
    pub fn sign_with(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        nonce: &str,
        timestamp_millis: i64,
    ) -> SignedRequest {
        let timestamp = timestamp_millis.to_string();
        let canonical = build_canonical_message(method, path, &timestamp, nonce, body);
        SignedRequest {
            signature: sign(&canonical, &self.key),
            algorithm: SUPPORTED_ALGORITHM,
            timestamp,
            nonce: nonce.to_owned(),
            body: body.to_vec(),
        }
    }
}

/// Sign a request in one call.
///
/// The body is serialized to JSON when present. A fresh nonce is generated
/// unless one is given; the timestamp is the current system time.
///
/// # Errors
///
/// Returns the serialization error if `body` cannot be encoded.
pub fn sign_request<T: Serialize>(
    method: &str,
    path: &str,
    body: Option<&T>,
    key: &[u8],
    nonce: Option<&str>,
) -> Result<SignedRequest, serde_json::Error> {
    let signer = RequestSigner::new(key);
    let bytes = match body {
        Some(value) => serde_json::to_vec(value)?,
        None => Vec::new(),
    };
    Ok(match nonce {
        Some(nonce) => signer.sign_with(method, path, &bytes, nonce, signer.clock.now_millis()),
        None => signer.sign(method, path, &bytes),
    })
}
