//! Configuration management for TenantGuard.
//!
//! Configuration is an explicit value built once at startup and handed to the
//! resolver by reference. Nothing in the verification path reads the
//! environment. [`GuardConfig::from_env`] is the only place that does.

use std::collections::BTreeSet;

use tracing::warn;

use crate::types::{
    KNOWN_SCOPES, Role, ServiceMembership, ServicePrincipal, TenantId, UserMembership,
    UserPrincipal,
};

/// Default allowed clock skew for signed requests.
pub const DEFAULT_ALLOWED_SKEW_MS: i64 = 30_000;

/// Default nonce retention (five minutes, ten times the default skew).
pub const DEFAULT_NONCE_TTL_MS: i64 = 300_000;

/// Default bound on a single JWT verification call.
pub const DEFAULT_JWT_TIMEOUT_MS: u64 = 5_000;

/// A static bearer token and the user it resolves to.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticUser {
    /// The bearer token.
    pub token: String,
    /// The user it resolves to.
    pub user: UserPrincipal,
}

impl std::fmt::Debug for StaticUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticUser")
            .field("token", &"...")
            .field("user", &self.user)
            .finish()
    }
}

/// A service API key and the service it resolves to.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceKey {
    /// The API key.
    pub key: String,
    /// The service it resolves to.
    pub service: ServicePrincipal,
}

impl std::fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceKey")
            .field("key", &"...")
            .field("service", &self.service)
            .finish()
    }
}

/// Shared secret for HMAC-signed requests.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmacConfig {
    /// The shared signing secret.
    pub secret: String,
    /// Tenants the secret is provisioned for.
    pub tenants: Vec<TenantId>,
    /// Scopes granted in each provisioned tenant.
    pub scopes: BTreeSet<String>,
}

impl HmacConfig {
    /// Provision `secret` for `tenants` with every known scope.
    pub fn new(secret: impl Into<String>, tenants: impl IntoIterator<Item = TenantId>) -> Self {
        Self {
            secret: secret.into(),
            tenants: tenants.into_iter().collect(),
            scopes: KNOWN_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl std::fmt::Debug for HmacConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacConfig")
            .field("secret", &"...")
            .field("tenants", &self.tenants)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Settings for verifying JWT bearer tokens against a remote key set.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtConfig {
    /// URL of the JSON Web Key Set.
    pub jwks_url: String,
    /// Required `iss` claim.
    pub issuer: Option<String>,
    /// Accepted `aud` values. Empty means the claim is not checked.
    pub audience: Vec<String>,
    /// Tenants in which verified users receive an `evaluator` membership.
    pub default_tenants: Vec<TenantId>,
    /// Upper bound on one verification call, in milliseconds.
    pub timeout_ms: u64,
}

/// Global configuration for TenantGuard.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    /// Bind address for the demo server.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// Static bearer tokens.
    pub static_users: Vec<StaticUser>,
    /// Service API keys.
    pub service_keys: Vec<ServiceKey>,
    /// HMAC signing secret, if HMAC requests are accepted.
    pub hmac: Option<HmacConfig>,
    /// Allowed difference between a signed timestamp and server time.
    pub allowed_skew_ms: i64,
    /// How long a seen nonce is retained.
    pub nonce_ttl_ms: i64,
    /// JWT verification, if external bearer tokens are accepted.
    pub jwt: Option<JwtConfig>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:4600".to_owned(),
            log_level: "info".to_owned(),
            static_users: Vec::new(),
            service_keys: Vec::new(),
            hmac: None,
            allowed_skew_ms: DEFAULT_ALLOWED_SKEW_MS,
            nonce_ttl_ms: DEFAULT_NONCE_TTL_MS,
            jwt: None,
        }
    }
}

impl GuardConfig {
    /// How long an accepted nonce blocks replays: the nonce TTL, but never
    /// less than twice the allowed skew.
    #[must_use]
    pub fn replay_window_ms(&self) -> i64 {
        self.nonce_ttl_ms
            .max(self.allowed_skew_ms.saturating_mul(2))
            .max(0)
    }

    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(token) = std::env::var("DEMO_BEARER_TOKEN") {
            config.static_users.push(demo_user(token));
        }
        if let Ok(key) = std::env::var("DEMO_API_KEY") {
            config.service_keys.push(demo_service(key));
        }
        if let Ok(secret) = std::env::var("DEMO_HMAC_KEY") {
            let tenants = env_tenants("HMAC_TENANTS");
            config.hmac = Some(HmacConfig::new(secret, tenants));
        }
        if let Some(v) = env_parse::<i64>("HMAC_ALLOWED_SKEW_MS") {
            config.allowed_skew_ms = v;
        }
        if let Some(v) = env_parse::<i64>("NONCE_TTL_MS") {
            config.nonce_ttl_ms = v;
        }
        if let Ok(jwks_url) = std::env::var("JWKS_URL") {
            config.jwt = Some(JwtConfig {
                jwks_url,
                issuer: std::env::var("JWT_ISSUER").ok(),
                audience: std::env::var("JWT_AUDIENCE")
                    .map(|v| split_list(&v).map(ToOwned::to_owned).collect::<Vec<_>>())
                    .unwrap_or_default(),
                default_tenants: env_tenants("JWT_DEFAULT_TENANTS"),
                timeout_ms: env_parse("JWT_TIMEOUT_MS").unwrap_or(DEFAULT_JWT_TIMEOUT_MS),
            });
        }

        if config.nonce_ttl_ms < 2 * config.allowed_skew_ms {
            warn!(
                nonce_ttl_ms = config.nonce_ttl_ms,
                allowed_skew_ms = config.allowed_skew_ms,
                replay_window_ms = config.replay_window_ms(),
                "nonce retention is shorter than twice the allowed skew; using twice the skew"
            );
        }

        config
    }
}

/// The demo admin user behind `DEMO_BEARER_TOKEN`.
#[must_use]
pub fn demo_user(token: String) -> StaticUser {
    StaticUser {
        token,
        user: UserPrincipal {
            id: "demoUser".to_owned(),
            is_super_user: false,
            memberships: vec![UserMembership {
                tenant_id: TenantId::new(1),
                role: Role::Admin,
                scopes: BTreeSet::new(),
            }],
        },
    }
}

/// The demo service behind `DEMO_API_KEY`.
#[must_use]
pub fn demo_service(key: String) -> ServiceKey {
    ServiceKey {
        key,
        service: ServicePrincipal {
            id: "demoKey".to_owned(),
            name: "demoKey".to_owned(),
            is_super_key: false,
            memberships: vec![ServiceMembership {
                tenant_id: TenantId::new(1),
                scopes: ["appointments:getAvailable", "appointments:make"]
                    .into_iter()
                    .map(ToOwned::to_owned)
                    .collect(),
            }],
        },
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

/// Read a comma-separated tenant list, defaulting to tenant 1.
fn env_tenants(name: &str) -> Vec<TenantId> {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_tenant_list(&v))
        .unwrap_or_else(|| vec![TenantId::new(1)])
}

/// Parse a comma-separated tenant list. Returns `None` if any entry is invalid.
#[must_use]
pub fn parse_tenant_list(raw: &str) -> Option<Vec<TenantId>> {
    split_list(raw).map(|s| TenantId::parse(s).ok()).collect()
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
