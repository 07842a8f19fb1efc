//! Errors that terminate the guard pipeline.

use tenantguard_auth::AuthError;
use tenantguard_authz::DenyReason;
use tenantguard_core::{CoreError, ErrorClass};

/// Every way a request can be turned away before or inside a handler.
///
/// `Display` is the message placed in the JSON `error` field.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Credential resolution failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The tenant id or configuration is invalid.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Authorization denied the request.
    #[error("{}", .0.message())]
    Denied(DenyReason),

    /// The request body could not be read.
    #[error("Invalid request body")]
    Body(String),

    /// The request body exceeds the configured limit.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// No route matches the path.
    #[error("Not found")]
    NotFound,

    /// The route does not accept the method.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl GuardError {
    /// Outcome class, when the error belongs to the authentication taxonomy.
    #[must_use]
    pub const fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Auth(e) => Some(e.class()),
            Self::Core(CoreError::InvalidTenant(_)) => Some(ErrorClass::Validation),
            Self::Core(CoreError::Config(_)) => Some(ErrorClass::Configuration),
            Self::Denied(reason) => Some(reason.class()),
            Self::Body(_) | Self::PayloadTooLarge | Self::NotFound | Self::MethodNotAllowed => {
                None
            }
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        if let Some(class) = self.class() {
            return class.status_code();
        }
        match self {
            Self::PayloadTooLarge => 413,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            _ => 400,
        }
    }

    /// Stable reason code for logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.reason(),
            Self::Core(CoreError::InvalidTenant(_)) => "invalid_tenant",
            Self::Core(CoreError::Config(_)) => "config",
            Self::Denied(reason) => reason.as_str(),
            Self::Body(_) => "invalid_body",
            Self::PayloadTooLarge => "payload_too_large",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }
}
