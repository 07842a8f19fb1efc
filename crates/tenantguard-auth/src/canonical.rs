//! Canonical message construction for HMAC-signed requests.
//!
//! The canonical message is the exact string that is signed and verified:
//!
//! ```text
//! HTTPRequestMethod\n
//! RequestPath\n
//! TimestampMillis\n
//! Nonce\n
//! HexEncode(SHA256(Body))
//! ```
//!
//! There is no trailing newline. The body hash is computed over the exact
//! bytes received, so any re-serialization by the receiver breaks the
//! signature.

use sha2::{Digest, Sha256};

/// Build the canonical message from its components.
///
/// # Examples
///
/// ```
/// use tenantguard_auth::canonical::build_canonical_message;
///
/// let canonical = build_canonical_message("GET", "/api/tenant/1/secured", "1700000000000", "0123456789abcdef", b"");
/// assert_eq!(
///     canonical,
///     "GET\n/api/tenant/1/secured\n1700000000000\n0123456789abcdef\n\
///      e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn build_canonical_message(
    method: &str,
    path: &str,
    timestamp: &str,
    nonce: &str,
    body: &[u8],
) -> String {
    let body_hash = hash_body(body);
    format!("{method}\n{path}\n{timestamp}\n{nonce}\n{body_hash}")
}

/// Compute the SHA-256 hash of the body and return it as a lowercase hex string.
///
/// # Examples
///
/// ```
/// use tenantguard_auth::canonical::hash_body;
///
/// // SHA-256 of empty body
/// assert_eq!(
///     hash_body(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_body(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
