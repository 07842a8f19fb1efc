//! Error types for credential verification.
//!
//! All authentication failures are represented by [`AuthError`]. The
//! `Display` text of each variant is the message returned to the caller, so
//! none of them may carry secret material.

use tenantguard_core::ErrorClass;

/// Errors that can occur while resolving a credential to a principal.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A credential scheme was presented but the deployment lacks the secret
    /// or verifier it needs. Carries the name of the missing setting.
    #[error("Missing {0} environment variable")]
    Misconfigured(&'static str),

    /// The signing algorithm is not supported (only `sha256` is).
    #[error("Unsupported signature algorithm")]
    UnsupportedAlgorithm(String),

    /// The `X-Timestamp` value is not an integer.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// The `X-Nonce` value is missing or too short.
    #[error("Invalid nonce")]
    InvalidNonce,

    /// The `X-Signature` value is not valid base64.
    #[error("Malformed signature")]
    MalformedSignature,

    /// The signed timestamp is too far from server time.
    #[error("Timestamp outside allowed skew")]
    ClockSkewExceeded,

    /// The nonce was already accepted within the replay window.
    #[error("Nonce already seen")]
    ReplayDetected,

    /// The computed signature does not match the provided signature.
    #[error("Invalid HMAC signature")]
    SignatureMismatch,

    /// A bearer token matched no static token and failed JWT verification.
    #[error("Invalid JWT")]
    InvalidCredential,

    /// The nonce store could not be read or written.
    #[error("Nonce store unavailable")]
    NonceStore(String),
}

impl AuthError {
    /// The outcome class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Misconfigured(_) | Self::NonceStore(_) => ErrorClass::Configuration,
            Self::UnsupportedAlgorithm(_)
            | Self::InvalidTimestamp
            | Self::InvalidNonce
            | Self::MalformedSignature => ErrorClass::Validation,
            Self::ClockSkewExceeded
            | Self::ReplayDetected
            | Self::SignatureMismatch
            | Self::InvalidCredential => ErrorClass::Authentication,
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.class().status_code()
    }

    /// Stable reason code for logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Misconfigured(_) => "misconfigured",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::InvalidNonce => "invalid_nonce",
            Self::MalformedSignature => "malformed_signature",
            Self::ClockSkewExceeded => "clock_skew_exceeded",
            Self::ReplayDetected => "replay_detected",
            Self::SignatureMismatch => "signature_mismatch",
            Self::InvalidCredential => "invalid_credential",
            Self::NonceStore(_) => "nonce_store_unavailable",
        }
    }
}
