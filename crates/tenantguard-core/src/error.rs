//! Error types for the TenantGuard core.

/// Outcome class of a rejected request.
///
/// Every rejection in the pipeline belongs to exactly one class, and the class
/// alone determines the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The deployment is broken (missing secret, unreachable store).
    Configuration,
    /// The request is malformed.
    Validation,
    /// A credential was presented but is invalid or replayed.
    Authentication,
    /// The credential is valid but lacks permission.
    Authorization,
    /// No credential was presented at all.
    Unauthenticated,
}

impl ErrorClass {
    /// HTTP status code for this class.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Configuration => 500,
            Self::Validation => 400,
            Self::Authentication | Self::Unauthenticated => 401,
            Self::Authorization => 403,
        }
    }
}

/// Core error type for TenantGuard.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Tenant identifier is not an integer.
    #[error("Invalid tenantId")]
    InvalidTenant(String),

    /// Configuration value could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}
