//! Tenant-scoped authorization for TenantGuard.
//!
//! Converts a resolved principal, a raw tenant id, and the roles/scopes an
//! endpoint requires into an allow/deny [`Decision`] with a reason code.

pub mod decision;
pub mod engine;

pub use decision::{AllowReason, Decision, DenyReason};
pub use engine::{AuthorizationEngine, Authorizer};
