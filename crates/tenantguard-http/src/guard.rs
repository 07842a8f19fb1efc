//! The request guard: extract, resolve, authorize.

use std::sync::Arc;

use tenantguard_auth::{PrincipalResolver, SigningContext};
use tenantguard_authz::{AuthorizationEngine, Authorizer, Decision};
use tenantguard_core::{AuthorizationCriteria, ResolvedPrincipal, TenantId};
use tracing::{debug, warn};

use crate::credentials::extract_credential;
use crate::error::GuardError;

/// A request that passed the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    /// The resolved principal. Immutable for the rest of the request.
    pub principal: ResolvedPrincipal,
    /// The tenant the request was authorized for.
    pub tenant: TenantId,
}

/// Return the path segment after `tenant/`, if any.
///
/// # Examples
///
/// ```
/// use tenantguard_http::guard::tenant_segment;
///
/// assert_eq!(tenant_segment("/api/tenant/42/secured"), Some("42"));
/// assert_eq!(tenant_segment("/api/tenant/42?x=1"), Some("42"));
/// assert_eq!(tenant_segment("/health"), None);
/// ```
#[must_use]
pub fn tenant_segment(path: &str) -> Option<&str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let mut segments = path.split('/');
    segments.find(|s| *s == "tenant")?;
    segments.next()
}

/// Runs credential resolution and authorization for each request.
#[derive(Clone)]
pub struct Guard {
    resolver: PrincipalResolver,
    authorizer: Arc<dyn Authorizer>,
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Guard {
    /// Create a guard using the default [`AuthorizationEngine`].
    #[must_use]
    pub fn new(resolver: PrincipalResolver) -> Self {
        Self {
            resolver,
            authorizer: Arc::new(AuthorizationEngine::new()),
        }
    }

    /// Admit or reject a request.
    ///
    /// `body` must be the exact bytes received; signed requests are verified
    /// over them.
    ///
    /// # Errors
    ///
    /// Resolution errors short-circuit first. A malformed tenant is then
    /// [`GuardError::Core`], and a denial is [`GuardError::Denied`].
    pub async fn admit(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
        criteria: &AuthorizationCriteria,
    ) -> Result<Admitted, GuardError> {
        let path = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), http::uri::PathAndQuery::as_str);

        let credential = extract_credential(&parts.headers);
        let ctx = SigningContext {
            method: parts.method.as_str(),
            path,
            body,
        };

        let principal = match self.resolver.resolve(credential.as_ref(), &ctx).await {
            Ok(principal) => principal,
            Err(e) => {
                if e.status_code() >= 500 {
                    warn!(reason = e.reason(), error = %e, "credential scheme not configured");
                } else {
                    debug!(reason = e.reason(), path, "credential rejected");
                }
                return Err(e.into());
            }
        };

        let raw_tenant = tenant_segment(path).unwrap_or_default();
        match self.authorizer.authorize(&principal, raw_tenant, criteria)? {
            Decision::Allow(_) => Ok(Admitted {
                principal,
                tenant: TenantId::parse(raw_tenant)?,
            }),
            Decision::Deny(reason) => Err(GuardError::Denied(reason)),
        }
    }
}
