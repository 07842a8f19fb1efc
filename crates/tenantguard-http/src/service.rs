//! Guarded HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use tenantguard_core::AuthorizationCriteria;
use tracing::debug;

use crate::dispatch::{GuardedRequest, ProtectedHandler};
use crate::error::GuardError;
use crate::guard::Guard;
use crate::response::{GuardResponseBody, error_to_response, json_response};

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the guarded HTTP service.
#[derive(Debug, Clone)]
pub struct GuardHttpConfig {
    /// Roles and scopes every guarded request must satisfy.
    pub criteria: AuthorizationCriteria,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Unguarded health check path.
    pub health_path: String,
}

impl Default for GuardHttpConfig {
    fn default() -> Self {
        Self {
            criteria: AuthorizationCriteria::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            health_path: "/health".to_owned(),
        }
    }
}

/// Hyper `Service` that guards every request except the health check and
/// forwards admitted requests to a [`ProtectedHandler`].
#[derive(Debug)]
pub struct GuardHttpService<H: ProtectedHandler> {
    handler: Arc<H>,
    guard: Arc<Guard>,
    config: Arc<GuardHttpConfig>,
}

impl<H: ProtectedHandler> GuardHttpService<H> {
    /// Create a new service.
    pub fn new(handler: Arc<H>, guard: Guard, config: GuardHttpConfig) -> Self {
        Self {
            handler,
            guard: Arc::new(guard),
            config: Arc::new(config),
        }
    }

    /// Run the full pipeline on an already collected request.
    pub async fn process(
        &self,
        parts: http::request::Parts,
        body: Bytes,
    ) -> http::Response<GuardResponseBody> {
        process_request(parts, body, self.handler.as_ref(), &self.guard, &self.config).await
    }
}

impl<H: ProtectedHandler> Clone for GuardHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            guard: Arc::clone(&self.guard),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: ProtectedHandler> hyper::service::Service<http::Request<Incoming>>
    for GuardHttpService<H>
{
    type Response = http::Response<GuardResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let response = match collect_body(incoming, service.config.max_body_bytes).await {
                Ok(body) => service.process(parts, body).await,
                Err(err) => error_to_response(&err),
            };
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process a single request: health check, route, guard, then handler.
async fn process_request<H: ProtectedHandler>(
    parts: http::request::Parts,
    body: Bytes,
    handler: &H,
    guard: &Guard,
    config: &GuardHttpConfig,
) -> http::Response<GuardResponseBody> {
    // 1. Health check bypasses the guard.
    if parts.method == http::Method::GET && parts.uri.path() == config.health_path {
        return json_response(
            http::StatusCode::OK,
            &serde_json::json!({ "status": "running" }),
        );
    }

    // 2. Unknown routes are rejected before any credential work.
    if let Err(err) = handler.route(&parts) {
        return error_to_response(&err);
    }

    // 3. Extract, resolve, authorize.
    let admitted = match guard.admit(&parts, &body, &config.criteria).await {
        Ok(admitted) => admitted,
        Err(err) => {
            debug!(
                method = %parts.method,
                path = parts.uri.path(),
                status = err.status_code(),
                reason = err.reason(),
                "request rejected"
            );
            return error_to_response(&err);
        }
    };

    // 4. Dispatch.
    match handler
        .handle(GuardedRequest {
            parts,
            body,
            admitted,
        })
        .await
    {
        Ok(response) => response,
        Err(err) => error_to_response(&err),
    }
}

/// Collect the incoming body, enforcing `limit`.
async fn collect_body(incoming: Incoming, limit: usize) -> Result<Bytes, GuardError> {
    Limited::new(incoming, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                GuardError::PayloadTooLarge
            } else {
                GuardError::Body(e.to_string())
            }
        })
}

/// Add headers every response carries.
fn add_common_headers(
    mut response: http::Response<GuardResponseBody>,
    request_id: &str,
) -> http::Response<GuardResponseBody> {
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().entry("x-request-id").or_insert(hv);
    }
    response
        .headers_mut()
        .insert("server", http::HeaderValue::from_static("TenantGuard"));
    response
}
