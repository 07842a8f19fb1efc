//! HMAC-SHA256 signing and verification of canonical messages.
//!
//! Signatures travel base64-encoded (standard alphabet, padded) in the
//! `X-Signature` header. Verification recomputes the expected MAC and compares
//! the raw bytes in constant time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the raw HMAC-SHA256 of `message` under `key`.
#[must_use]
pub fn compute_signature(key: &[u8], message: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Sign a canonical message and return the base64-encoded signature.
///
/// # Examples
///
/// ```
/// use tenantguard_auth::signature::{sign, verify};
///
/// let sig = sign("GET\n/\n1\nnonce-123\nhash", b"secret");
/// assert!(verify("GET\n/\n1\nnonce-123\nhash", b"secret", &sig).is_ok());
/// ```
#[must_use]
pub fn sign(message: &str, key: &[u8]) -> String {
    BASE64.encode(compute_signature(key, message))
}

/// Verify a base64-encoded signature over a canonical message.
///
/// # Errors
///
/// Returns [`AuthError::MalformedSignature`] if `provided` is not valid
/// base64, or [`AuthError::SignatureMismatch`] if it does not match.
pub fn verify(canonical: &str, key: &[u8], provided: &str) -> Result<(), AuthError> {
    let provided_bytes = BASE64
        .decode(provided.trim())
        .map_err(|_| AuthError::MalformedSignature)?;

    let expected = compute_signature(key, canonical);

    if provided_bytes.as_slice().ct_eq(expected.as_slice()).into() {
        debug!("HMAC signature verification succeeded");
        Ok(())
    } else {
        debug!("HMAC signature mismatch");
        Err(AuthError::SignatureMismatch)
    }
}

/// Compare two secrets without leaking their contents through timing.
///
/// Both sides are hashed first so the comparison always runs over 32 bytes,
/// whatever the input lengths.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let a = Sha256::digest(a);
    let b = Sha256::digest(b);
    a.as_slice().ct_eq(b.as_slice()).into()
}
