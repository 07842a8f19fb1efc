//! Service API key generation and parsing.
//!
//! Keys have the form `mfk_<prefix>.<secret>`. The prefix is safe to store
//! and index in clear; the secret is the part a record store would hash.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Leading marker of every generated key.
pub const API_KEY_MARKER: &str = "mfk_";

const PREFIX_BYTES: usize = 6;
const SECRET_BYTES: usize = 48;

/// A generated API key and its parts.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    /// The full key handed to the client.
    pub key: String,
    /// The lookup prefix.
    pub prefix: String,
    /// The secret part.
    pub secret: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn random_token(bytes: usize) -> String {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; bytes];
    rng.fill(buf.as_mut_slice());
    URL_SAFE_NO_PAD.encode(buf)
}

/// Generate a new random API key.
///
/// # Examples
///
/// ```
/// use tenantguard_auth::api_key::{generate_api_key, parse_api_key};
///
/// let generated = generate_api_key();
/// assert!(generated.key.starts_with("mfk_"));
/// let (prefix, secret) = parse_api_key(&generated.key).unwrap();
/// assert_eq!(prefix, generated.prefix);
/// assert_eq!(secret, generated.secret);
/// ```
#[must_use]
pub fn generate_api_key() -> ApiKey {
    let prefix = random_token(PREFIX_BYTES);
    let secret = random_token(SECRET_BYTES);
    ApiKey {
        key: format!("{API_KEY_MARKER}{prefix}.{secret}"),
        prefix,
        secret,
    }
}

/// Split a key into its prefix and secret.
///
/// Returns `None` if the key lacks the marker, the separator, or either part.
#[must_use]
pub fn parse_api_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(API_KEY_MARKER)?;
    let (prefix, secret) = rest.split_once('.')?;
    if prefix.is_empty() || secret.is_empty() {
        return None;
    }
    Some((prefix, secret))
}
