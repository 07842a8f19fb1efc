//! Credential to principal resolution.
//!
//! [`PrincipalResolver`] dispatches on the credential kind and drives the
//! replay guard, the signature codec, and the JWT capability. It is built once
//! from a [`GuardConfig`] and shared across requests; it never reads the
//! environment.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tenantguard_core::{
    Credential, CredentialKind, GuardConfig, HmacConfig, Principal, ResolvedPrincipal, Role,
    ServiceMembership, ServicePrincipal, TenantId, UserMembership, UserPrincipal,
};
use tracing::{debug, warn};

use crate::canonical::build_canonical_message;
use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;
use crate::jwt::JwtVerifier;
use crate::nonce::NonceStore;
use crate::replay::ReplayGuard;
use crate::signature::{constant_time_eq, verify};

/// The parts of a request an HMAC signature covers.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    /// HTTP method, verbatim.
    pub method: &'a str,
    /// Request path and query, verbatim.
    pub path: &'a str,
    /// Raw request body.
    pub body: &'a [u8],
}

/// Resolves a request credential to a [`ResolvedPrincipal`].
#[derive(Clone)]
pub struct PrincipalResolver {
    config: Arc<GuardConfig>,
    replay_guard: ReplayGuard,
    jwt_verifier: Option<Arc<dyn JwtVerifier>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("config", &self.config)
            .field("replay_guard", &self.replay_guard)
            .field("jwt_verifier", &self.jwt_verifier.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}

impl PrincipalResolver {
    /// Create a resolver over `config` using `nonce_store` for replay
    /// detection.
    #[must_use]
    pub fn new(config: Arc<GuardConfig>, nonce_store: Arc<dyn NonceStore>) -> Self {
        let replay_guard = ReplayGuard::new(
            nonce_store,
            config.allowed_skew_ms,
            config.replay_window_ms(),
        );
        Self {
            config,
            replay_guard,
            jwt_verifier: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Accept bearer tokens verified by `verifier`.
    #[must_use]
    pub fn with_jwt_verifier(mut self, verifier: Arc<dyn JwtVerifier>) -> Self {
        self.jwt_verifier = Some(verifier);
        self
    }

    /// Use `clock` as the current time for skew and replay checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration this resolver was built from.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Resolve `credential` to a principal.
    ///
    /// A request without a credential resolves to [`Principal::Public`]. An
    /// API key that matches nothing also resolves to `Public`, but with the
    /// credential recorded so authorization denies with 403 rather than 401.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Misconfigured`] when the presented scheme is not
    /// configured, and the specific validation or authentication error when
    /// a bearer token or signed request is rejected.
    pub async fn resolve(
        &self,
        credential: Option<&Credential>,
        ctx: &SigningContext<'_>,
    ) -> Result<ResolvedPrincipal, AuthError> {
        let Some(credential) = credential else {
            return Ok(ResolvedPrincipal::anonymous());
        };

        let principal = match credential {
            Credential::ApiKey { key } => self.resolve_api_key(key)?,
            Credential::BearerToken { token } => self.resolve_bearer(token).await?,
            Credential::HmacSigned {
                signature,
                timestamp,
                algorithm,
                nonce,
            } => {
                self.resolve_hmac(signature, timestamp, algorithm, nonce, ctx)
                    .await?
            }
        };

        debug!(
            credential = %credential.kind(),
            principal = principal.kind(),
            principal_id = principal.id().unwrap_or("-"),
            "resolved principal"
        );

        Ok(ResolvedPrincipal {
            principal,
            credential: Some(credential.kind()),
        })
    }

    fn resolve_api_key(&self, key: &str) -> Result<Principal, AuthError> {
        if self.config.service_keys.is_empty() {
            return Err(AuthError::Misconfigured("DEMO_API_KEY"));
        }

        // Every configured key is compared so the match position does not
        // show up in timing.
        let mut matched = None;
        for entry in &self.config.service_keys {
            if constant_time_eq(entry.key.as_bytes(), key.as_bytes()) && matched.is_none() {
                matched = Some(&entry.service);
            }
        }

        Ok(match matched {
            Some(service) => Principal::Service(service.clone()),
            None => {
                debug!(credential = %CredentialKind::ApiKey, "API key did not match");
                Principal::Public
            }
        })
    }

    async fn resolve_bearer(&self, token: &str) -> Result<Principal, AuthError> {
        let mut matched = None;
        for entry in &self.config.static_users {
            if constant_time_eq(entry.token.as_bytes(), token.as_bytes()) && matched.is_none() {
                matched = Some(&entry.user);
            }
        }
        if let Some(user) = matched {
            return Ok(Principal::User(user.clone()));
        }

        let Some(verifier) = &self.jwt_verifier else {
            if self.config.static_users.is_empty() {
                return Err(AuthError::Misconfigured("JWKS_URL"));
            }
            debug!(credential = %CredentialKind::BearerToken, "bearer token did not match");
            return Err(AuthError::InvalidCredential);
        };

        let timeout_ms = self
            .config
            .jwt
            .as_ref()
            .map_or(tenantguard_core::DEFAULT_JWT_TIMEOUT_MS, |jwt| jwt.timeout_ms);

        let verified = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            verifier.verify(token),
        )
        .await
        {
            Ok(Ok(verified)) => verified,
            Ok(Err(e)) => {
                debug!(error = %e, "JWT rejected");
                return Err(AuthError::InvalidCredential);
            }
            Err(_) => {
                warn!(timeout_ms, "JWT verification timed out");
                return Err(AuthError::InvalidCredential);
            }
        };

        let tenants = self
            .config
            .jwt
            .as_ref()
            .map_or_else(|| vec![TenantId::new(1)], |jwt| jwt.default_tenants.clone());

        Ok(Principal::User(UserPrincipal {
            id: verified.subject,
            is_super_user: false,
            memberships: tenants
                .into_iter()
                .map(|tenant_id| UserMembership {
                    tenant_id,
                    role: Role::Evaluator,
                    scopes: std::collections::BTreeSet::new(),
                })
                .collect(),
        }))
    }

    async fn resolve_hmac(
        &self,
        signature: &str,
        timestamp: &str,
        algorithm: &str,
        nonce: &str,
        ctx: &SigningContext<'_>,
    ) -> Result<Principal, AuthError> {
        let hmac = self
            .config
            .hmac
            .as_ref()
            .ok_or(AuthError::Misconfigured("DEMO_HMAC_KEY"))?;

        let now = self.clock.now_millis();
        if let Err(e) = self
            .replay_guard
            .check(nonce, timestamp, algorithm, now)
            .await
        {
            debug!(reason = e.reason(), "signed request rejected");
            return Err(e);
        }

        // The canonical message uses the timestamp exactly as sent.
        let canonical = build_canonical_message(ctx.method, ctx.path, timestamp, nonce, ctx.body);
        if let Err(e) = verify(&canonical, hmac.secret.as_bytes(), signature) {
            debug!(reason = e.reason(), method = ctx.method, path = ctx.path, "signed request rejected");
            return Err(e);
        }

        Ok(Principal::Service(hmac_service(hmac)))
    }
}

/// The service principal an HMAC secret resolves to.
///
/// The id is derived from a digest of the secret, so it is stable across
/// restarts without revealing the secret.
#[must_use]
pub fn hmac_service(hmac: &HmacConfig) -> ServicePrincipal {
    let digest = hex::encode(Sha256::digest(hmac.secret.as_bytes()));
    ServicePrincipal {
        id: format!("hmac-{}", &digest[..16]),
        name: "hmac".to_owned(),
        is_super_key: false,
        memberships: hmac
            .tenants
            .iter()
            .map(|tenant_id| ServiceMembership {
                tenant_id: *tenant_id,
                scopes: hmac.scopes.clone(),
            })
            .collect(),
    }
}
