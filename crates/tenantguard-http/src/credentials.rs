//! Credential extraction from request headers.
//!
//! At most one credential is derived per request. When several header sets
//! are present, precedence is bearer token, then API key, then HMAC.

use http::HeaderMap;
use tenantguard_core::Credential;

/// `X-Api-Key` header.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Read a header as a string, ignoring values that are not visible ASCII.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract the bearer token from `Authorization`, if the scheme is `Bearer`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, http::header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Derive the request credential from its headers.
///
/// An HMAC credential is derived whenever `X-Signature` is present. Missing
/// companion headers become empty strings and fail validation later.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use tenantguard_core::Credential;
/// use tenantguard_http::credentials::extract_credential;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", "Bearer abc".parse().unwrap());
/// headers.insert("x-api-key", "key".parse().unwrap());
/// assert_eq!(
///     extract_credential(&headers),
///     Some(Credential::BearerToken { token: "abc".to_owned() })
/// );
/// ```
#[must_use]
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    if let Some(token) = bearer_token(headers) {
        return Some(Credential::BearerToken {
            token: token.to_owned(),
        });
    }

    if let Some(key) = header_str(headers, API_KEY_HEADER) {
        return Some(Credential::ApiKey {
            key: key.to_owned(),
        });
    }

    let signature = header_str(headers, tenantguard_auth::signer::SIGNATURE_HEADER)?;
    let companion = |name: &str| header_str(headers, name).unwrap_or_default().to_owned();
    Some(Credential::HmacSigned {
        signature: signature.to_owned(),
        timestamp: companion(tenantguard_auth::signer::TIMESTAMP_HEADER),
        algorithm: companion(tenantguard_auth::signer::SIGNATURE_ALG_HEADER),
        nonce: companion(tenantguard_auth::signer::NONCE_HEADER),
    })
}
