//! The role/scope authorization algorithm.

use tenantguard_core::{
    AuthorizationCriteria, CoreError, Principal, ResolvedPrincipal, ServicePrincipal, TenantId,
    UserPrincipal,
};
use tracing::debug;

use crate::decision::{AllowReason, Decision, DenyReason};

/// Authorization seam between the resolved principal and a protected
/// operation.
pub trait Authorizer: Send + Sync {
    /// Decide whether `resolved` may act in `tenant` under `criteria`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTenant`] if `tenant` is not an integer.
    fn authorize(
        &self,
        resolved: &ResolvedPrincipal,
        tenant: &str,
        criteria: &AuthorizationCriteria,
    ) -> Result<Decision, CoreError>;
}

/// The default authorizer: super flags, then exact-tenant membership, then
/// role OR scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEngine;

impl AuthorizationEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluate an already parsed tenant.
    #[must_use]
    pub fn decide(
        &self,
        resolved: &ResolvedPrincipal,
        tenant: TenantId,
        criteria: &AuthorizationCriteria,
    ) -> Decision {
        match &resolved.principal {
            Principal::User(user) => decide_user(user, tenant, criteria),
            Principal::Service(service) => decide_service(service, tenant, criteria),
            Principal::Public if resolved.credential_presented() => {
                Decision::Deny(DenyReason::UnrecognizedCredential)
            }
            Principal::Public => Decision::Deny(DenyReason::Unauthenticated),
        }
    }
}

impl Authorizer for AuthorizationEngine {
    fn authorize(
        &self,
        resolved: &ResolvedPrincipal,
        tenant: &str,
        criteria: &AuthorizationCriteria,
    ) -> Result<Decision, CoreError> {
        // Tenant validation precedes any look at the principal.
        let tenant = TenantId::parse(tenant)?;
        let decision = self.decide(resolved, tenant, criteria);

        match decision {
            Decision::Allow(reason) => debug!(
                tenant = %tenant,
                principal = resolved.principal.kind(),
                principal_id = resolved.principal.id().unwrap_or("-"),
                ?reason,
                "authorization allowed"
            ),
            Decision::Deny(reason) => debug!(
                tenant = %tenant,
                principal = resolved.principal.kind(),
                principal_id = resolved.principal.id().unwrap_or("-"),
                reason = reason.as_str(),
                "authorization denied"
            ),
        }

        Ok(decision)
    }
}

fn decide_user(user: &UserPrincipal, tenant: TenantId, criteria: &AuthorizationCriteria) -> Decision {
    if user.is_super_user {
        return Decision::Allow(AllowReason::SuperUser);
    }
    let Some(membership) = user.membership(tenant) else {
        return Decision::Deny(DenyReason::NoMembership);
    };
    if criteria.required_roles.contains(&membership.role) {
        Decision::Allow(AllowReason::RoleMatched)
    } else if criteria.any_scope_in(&membership.scopes) {
        Decision::Allow(AllowReason::ScopeMatched)
    } else {
        Decision::Deny(DenyReason::InsufficientPermissions)
    }
}

fn decide_service(
    service: &ServicePrincipal,
    tenant: TenantId,
    criteria: &AuthorizationCriteria,
) -> Decision {
    if service.is_super_key {
        return Decision::Allow(AllowReason::SuperKey);
    }
    let Some(membership) = service.membership(tenant) else {
        return Decision::Deny(DenyReason::NoMembership);
    };
    if criteria.any_scope_in(&membership.scopes) {
        Decision::Allow(AllowReason::ScopeMatched)
    } else {
        Decision::Deny(DenyReason::InsufficientPermissions)
    }
}
