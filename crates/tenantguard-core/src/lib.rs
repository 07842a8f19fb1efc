//! Core types, configuration, and errors for TenantGuard.
//!
//! This crate provides the data model shared by the authentication,
//! authorization, and HTTP crates: credentials, principals, tenant
//! memberships, authorization criteria, and the explicit [`GuardConfig`]
//! value that every other component is constructed from.

mod config;
mod error;
mod types;

pub use config::{
    DEFAULT_ALLOWED_SKEW_MS, DEFAULT_JWT_TIMEOUT_MS, DEFAULT_NONCE_TTL_MS, GuardConfig,
    HmacConfig, JwtConfig, ServiceKey, StaticUser, demo_service, demo_user, parse_tenant_list,
};
pub use error::{CoreError, ErrorClass};
pub use types::{
    AuthorizationCriteria, Credential, CredentialKind, KNOWN_SCOPES, Principal,
    ResolvedPrincipal, Role, ServiceMembership, ServicePrincipal, TenantId, UserMembership,
    UserPrincipal,
};
