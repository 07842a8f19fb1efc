//! Authorization decisions and reason codes.

use tenantguard_core::ErrorClass;

/// Why a request was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    /// The user is a super user.
    SuperUser,
    /// The service holds a super key.
    SuperKey,
    /// The membership role is one of the required roles.
    RoleMatched,
    /// The membership grants at least one required scope.
    ScopeMatched,
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No credential was presented.
    Unauthenticated,
    /// A credential was presented but resolved to no identity.
    UnrecognizedCredential,
    /// The principal has no membership in the tenant.
    NoMembership,
    /// The membership satisfies neither the roles nor the scopes.
    InsufficientPermissions,
}

impl DenyReason {
    /// Outcome class of this denial.
    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self {
            Self::Unauthenticated => ErrorClass::Unauthenticated,
            Self::UnrecognizedCredential | Self::NoMembership | Self::InsufficientPermissions => {
                ErrorClass::Authorization
            }
        }
    }

    /// HTTP status code of this denial.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        self.class().status_code()
    }

    /// Message returned to the caller.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthorized",
            Self::UnrecognizedCredential | Self::NoMembership | Self::InsufficientPermissions => {
                "Forbidden"
            }
        }
    }

    /// Stable reason code for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::UnrecognizedCredential => "unrecognized_credential",
            Self::NoMembership => "no_membership",
            Self::InsufficientPermissions => "insufficient_permissions",
        }
    }
}

/// Outcome of evaluating a principal against a tenant and criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Access granted.
    Allow(AllowReason),
    /// Access denied.
    Deny(DenyReason),
}

impl Decision {
    /// Whether access was granted.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow(_))
    }
}
