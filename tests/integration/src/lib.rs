//! Scenario tests for the TenantGuard request pipeline.
//!
//! Every test builds the guarded service in-process with a fixed clock, so
//! nothing depends on an external server or on wall-clock time. The
//! `test_server` module additionally binds an ephemeral port and talks to
//! the service over real HTTP.

use std::collections::BTreeSet;
use std::sync::{Arc, Once};

use bytes::Bytes;
use http_body_util::BodyExt;
use tenantguard_auth::{
    Clock, JwtVerifier, ManualClock, MemoryNonceStore, PrincipalResolver, RequestSigner,
};
use tenantguard_core::{
    AuthorizationCriteria, GuardConfig, HmacConfig, Role, ServiceKey, ServiceMembership,
    ServicePrincipal, StaticUser, TenantId, UserPrincipal, demo_service, demo_user,
};
use tenantguard_http::response::json_response;
use tenantguard_http::{
    Guard, GuardError, GuardHttpConfig, GuardHttpService, GuardedRequest, HandlerFuture,
    ProtectedHandler,
};

static INIT: Once = Once::new();

/// Fixed "now" for every scenario, in epoch milliseconds.
pub const NOW: i64 = 1_700_000_000_000;
/// Static bearer token of the demo admin (tenant 1).
pub const DEMO_BEARER: &str = "demoBearerToken";
/// Static bearer token of a super user.
pub const SUPER_BEARER: &str = "superUserToken";
/// API key of the demo service (tenant 1, get and make scopes).
pub const DEMO_API_KEY: &str = "demoApiKey";
/// API key of a service holding only `appointments:getAvailable`.
pub const READ_ONLY_API_KEY: &str = "readOnlyApiKey";
/// Shared HMAC secret.
pub const HMAC_SECRET: &str = "integration-hmac-secret";
/// Path of the secured endpoint for tenant 1.
pub const SECURED_PATH: &str = "/api/tenant/1/secured";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Answers `{"message":"Hello World"}` on `/api/tenant/{tenantId}/secured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloHandler;

impl ProtectedHandler for HelloHandler {
    fn route(&self, parts: &http::request::Parts) -> Result<(), GuardError> {
        let segments: Vec<&str> = parts.uri.path().split('/').collect();
        if matches!(segments.as_slice(), ["", "api", "tenant", _, "secured"]) {
            Ok(())
        } else {
            Err(GuardError::NotFound)
        }
    }

    fn handle(&self, _request: GuardedRequest) -> HandlerFuture {
        Box::pin(async {
            Ok(json_response(
                http::StatusCode::OK,
                &serde_json::json!({ "message": "Hello World" }),
            ))
        })
    }
}

/// Criteria of the demo secured endpoint.
#[must_use]
pub fn secured_criteria() -> AuthorizationCriteria {
    AuthorizationCriteria::new([Role::Admin], ["appointments:getAvailable"])
}

/// Configuration with every credential scheme enabled.
#[must_use]
pub fn test_config() -> GuardConfig {
    let super_user = StaticUser {
        token: SUPER_BEARER.to_owned(),
        user: UserPrincipal {
            id: "root".to_owned(),
            is_super_user: true,
            memberships: Vec::new(),
        },
    };
    let read_only = ServiceKey {
        key: READ_ONLY_API_KEY.to_owned(),
        service: ServicePrincipal {
            id: "reader".to_owned(),
            name: "reader".to_owned(),
            is_super_key: false,
            memberships: vec![ServiceMembership {
                tenant_id: TenantId::new(1),
                scopes: BTreeSet::from(["appointments:getAvailable".to_owned()]),
            }],
        },
    };

    GuardConfig {
        static_users: vec![demo_user(DEMO_BEARER.to_owned()), super_user],
        service_keys: vec![demo_service(DEMO_API_KEY.to_owned()), read_only],
        hmac: Some(HmacConfig::new(HMAC_SECRET, [TenantId::new(1)])),
        ..GuardConfig::default()
    }
}

/// A response reduced to what scenarios assert on.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status.
    pub status: http::StatusCode,
    /// Parsed JSON body.
    pub json: serde_json::Value,
}

impl TestResponse {
    /// The `error` field of the body, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.json.get("error").and_then(serde_json::Value::as_str)
    }
}

/// An in-process guarded service with a controllable clock.
#[derive(Debug)]
pub struct Harness {
    service: GuardHttpService<HelloHandler>,
    clock: Arc<ManualClock>,
    signer: RequestSigner,
}

impl Harness {
    /// Harness over [`test_config`] guarding with [`secured_criteria`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start customizing a harness.
    #[must_use]
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            config: test_config(),
            criteria: secured_criteria(),
            jwt_verifier: None,
        }
    }

    /// The clock shared by the resolver and the signer.
    #[must_use]
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Sign a request with the shared secret at the current clock time.
    #[must_use]
    pub fn signed(&self, method: &str, path: &str, body: &[u8], nonce: &str) -> http::Request<Bytes> {
        self.signed_at(method, path, body, nonce, self.clock.now_millis())
    }

    /// Sign a request with an explicit timestamp.
    #[must_use]
    pub fn signed_at(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        nonce: &str,
        timestamp: i64,
    ) -> http::Request<Bytes> {
        let signed = self.signer.sign_with(method, path, body, nonce, timestamp);
        let mut builder = http::Request::builder().method(method).uri(path);
        for (name, value) in signed.headers() {
            builder = builder.header(name, value);
        }
        builder
            .body(Bytes::from(signed.body))
            .expect("valid signed request")
    }

    /// Send a request through the full pipeline.
    pub async fn send(&self, request: http::Request<Bytes>) -> TestResponse {
        let (parts, body) = request.into_parts();
        let response = self.service.process(parts, body).await;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("infallible body")
            .to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        TestResponse { status, json }
    }

    /// The underlying hyper service.
    #[must_use]
    pub fn service(&self) -> GuardHttpService<HelloHandler> {
        self.service.clone()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Harness`].
#[derive(Default)]
pub struct HarnessBuilder {
    config: GuardConfig,
    criteria: AuthorizationCriteria,
    jwt_verifier: Option<Arc<dyn JwtVerifier>>,
}

impl std::fmt::Debug for HarnessBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessBuilder")
            .field("config", &self.config)
            .field("criteria", &self.criteria)
            .finish_non_exhaustive()
    }
}

impl HarnessBuilder {
    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the endpoint criteria.
    #[must_use]
    pub fn criteria(mut self, criteria: AuthorizationCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Inject a JWT verifier.
    #[must_use]
    pub fn jwt_verifier(mut self, verifier: Arc<dyn JwtVerifier>) -> Self {
        self.jwt_verifier = Some(verifier);
        self
    }

    /// Build the harness.
    #[must_use]
    pub fn build(self) -> Harness {
        init_tracing();

        let clock = Arc::new(ManualClock::new(NOW));
        let secret = self
            .config
            .hmac
            .as_ref()
            .map_or_else(|| HMAC_SECRET.to_owned(), |h| h.secret.clone());
        let store = Arc::new(MemoryNonceStore::with_clock(
            self.config.replay_window_ms(),
            clock.clone(),
        ));

        let mut resolver = PrincipalResolver::new(Arc::new(self.config), store)
            .with_clock(clock.clone());
        if let Some(verifier) = self.jwt_verifier {
            resolver = resolver.with_jwt_verifier(verifier);
        }

        let service = GuardHttpService::new(
            Arc::new(HelloHandler),
            Guard::new(resolver),
            GuardHttpConfig {
                criteria: self.criteria,
                ..GuardHttpConfig::default()
            },
        );

        Harness {
            service,
            signer: RequestSigner::new(secret).with_clock(clock.clone()),
            clock,
        }
    }
}

/// A plain request with optional headers and an empty body.
#[must_use]
pub fn request(method: &str, path: &str, headers: &[(&str, &str)]) -> http::Request<Bytes> {
    let mut builder = http::Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::new()).expect("valid request")
}

mod test_api_key;
mod test_bearer;
mod test_hmac;
