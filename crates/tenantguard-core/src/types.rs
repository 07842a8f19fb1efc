//! Credential, principal, and membership types shared across TenantGuard.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Every scope a fully-privileged HMAC client is provisioned with.
pub const KNOWN_SCOPES: &[&str] = &[
    "appointments:getAvailable",
    "appointments:make",
    "appointments:cancel",
];

/// Tenant identifier (integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TenantId(i64);

impl TenantId {
    /// Create a tenant ID from an integer.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Parse a tenant ID from its textual form.
    ///
    /// Only plain base-10 integers are accepted; there is no trimming and no
    /// fractional or exponent notation.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidTenant`] if the text is not an integer.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        raw.parse::<i64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidTenant(raw.to_owned()))
    }

    /// Get the tenant ID as an integer.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for TenantId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role held by a user within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// May modify tenant data.
    Editor,
    /// Read-only access.
    Viewer,
    /// Default role for users admitted through an external identity provider.
    Evaluator,
}

impl Role {
    /// Get the role name as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
            Self::Evaluator => "evaluator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's association with a tenant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMembership {
    /// Tenant the membership applies to.
    pub tenant_id: TenantId,
    /// Role within the tenant.
    pub role: Role,
    /// Fine-grained permissions granted in addition to the role.
    pub scopes: BTreeSet<String>,
}

/// A service's association with a tenant. Services carry scopes only.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMembership {
    /// Tenant the membership applies to.
    pub tenant_id: TenantId,
    /// Permissions granted within the tenant.
    pub scopes: BTreeSet<String>,
}

/// An authenticated end user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPrincipal {
    /// User identifier.
    pub id: String,
    /// Super users bypass every tenant check.
    pub is_super_user: bool,
    /// Tenant memberships.
    pub memberships: Vec<UserMembership>,
}

impl UserPrincipal {
    /// Find the membership for exactly this tenant.
    #[must_use]
    pub fn membership(&self, tenant_id: TenantId) -> Option<&UserMembership> {
        self.memberships.iter().find(|m| m.tenant_id == tenant_id)
    }
}

/// An authenticated machine client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    /// Service identifier.
    pub id: String,
    /// Human-readable service name.
    pub name: String,
    /// Super keys bypass every tenant check.
    pub is_super_key: bool,
    /// Tenant memberships.
    pub memberships: Vec<ServiceMembership>,
}

impl ServicePrincipal {
    /// Find the membership for exactly this tenant.
    #[must_use]
    pub fn membership(&self, tenant_id: TenantId) -> Option<&ServiceMembership> {
        self.memberships.iter().find(|m| m.tenant_id == tenant_id)
    }
}

/// The identity derived from a request's credential.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Principal {
    /// An end user.
    User(UserPrincipal),
    /// A machine client.
    Service(ServicePrincipal),
    /// Anonymous caller.
    Public,
}

impl Principal {
    /// Short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Service(_) => "service",
            Self::Public => "public",
        }
    }

    /// The principal identifier, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::User(user) => Some(&user.id),
            Self::Service(service) => Some(&service.id),
            Self::Public => None,
        }
    }
}

/// A credential presented by a request. Exactly one is derived per request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// `X-Api-Key` header.
    ApiKey {
        /// The presented key.
        key: String,
    },
    /// `Authorization: Bearer` header.
    BearerToken {
        /// The presented token (static or JWT).
        token: String,
    },
    /// `X-Signature` and its companion headers.
    HmacSigned {
        /// Base64 HMAC-SHA256 signature.
        signature: String,
        /// Epoch milliseconds as text.
        timestamp: String,
        /// Signature algorithm name.
        algorithm: String,
        /// Caller-chosen nonce.
        nonce: String,
    },
}

impl Credential {
    /// The kind of credential, for logging and error reporting.
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::ApiKey { .. } => CredentialKind::ApiKey,
            Self::BearerToken { .. } => CredentialKind::BearerToken,
            Self::HmacSigned { .. } => CredentialKind::HmacSigned,
        }
    }
}

// Secrets never reach logs through `{:?}`.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { .. } => f.debug_struct("ApiKey").field("key", &"<redacted>").finish(),
            Self::BearerToken { .. } => f
                .debug_struct("BearerToken")
                .field("token", &"<redacted>")
                .finish(),
            Self::HmacSigned {
                timestamp,
                algorithm,
                nonce,
                ..
            } => f
                .debug_struct("HmacSigned")
                .field("signature", &"<redacted>")
                .field("timestamp", timestamp)
                .field("algorithm", algorithm)
                .field("nonce", nonce)
                .finish(),
        }
    }
}

/// Discriminant of [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// API key.
    ApiKey,
    /// Bearer token.
    BearerToken,
    /// HMAC-signed request.
    HmacSigned,
}

impl CredentialKind {
    /// Get the kind name as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::BearerToken => "bearer_token",
            Self::HmacSigned => "hmac_signed",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A principal together with the kind of credential it was resolved from.
///
/// `credential` is `None` only when the request carried no credential at all,
/// which lets authorization tell "never authenticated" apart from "presented
/// something we did not recognize".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrincipal {
    /// The resolved identity.
    pub principal: Principal,
    /// The kind of credential the request presented.
    pub credential: Option<CredentialKind>,
}

impl ResolvedPrincipal {
    /// A request that carried no credential.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            principal: Principal::Public,
            credential: None,
        }
    }

    /// Whether the request presented any credential.
    #[must_use]
    pub const fn credential_presented(&self) -> bool {
        self.credential.is_some()
    }
}

/// Roles and scopes an endpoint requires. Either one grants access.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCriteria {
    /// A user holding any of these roles is admitted.
    pub required_roles: BTreeSet<Role>,
    /// A principal holding any of these scopes is admitted.
    pub required_scopes: BTreeSet<String>,
}

impl AuthorizationCriteria {
    /// Create criteria from roles and scopes.
    pub fn new<S: Into<String>>(
        roles: impl IntoIterator<Item = Role>,
        scopes: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            required_roles: roles.into_iter().collect(),
            required_scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any required scope is in `granted`.
    #[must_use]
    pub fn any_scope_in(&self, granted: &BTreeSet<String>) -> bool {
        !self.required_scopes.is_disjoint(granted)
    }
}
