//! Handler for the demo secured endpoint.

use tenantguard_core::{AuthorizationCriteria, Role};
use tenantguard_http::response::json_response;
use tenantguard_http::{GuardError, GuardedRequest, HandlerFuture, ProtectedHandler};
use tracing::info;

/// Criteria guarding `/api/tenant/{tenantId}/secured`.
pub fn secured_criteria() -> AuthorizationCriteria {
    AuthorizationCriteria::new([Role::Admin], ["appointments:getAvailable"])
}

/// Whether `path` is `/api/tenant/{tenantId}/secured`.
fn is_secured_path(path: &str) -> bool {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    matches!(segments.as_slice(), ["", "api", "tenant", _, "secured"])
}

/// Answers `{"message":"Hello World"}` on the secured route.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecuredHandler;

impl ProtectedHandler for SecuredHandler {
    fn route(&self, parts: &http::request::Parts) -> Result<(), GuardError> {
        if !is_secured_path(parts.uri.path()) {
            return Err(GuardError::NotFound);
        }
        if parts.method != http::Method::GET && parts.method != http::Method::POST {
            return Err(GuardError::MethodNotAllowed);
        }
        Ok(())
    }

    fn handle(&self, request: GuardedRequest) -> HandlerFuture {
        Box::pin(async move {
            info!(
                tenant = %request.admitted.tenant,
                principal = request.admitted.principal.principal.kind(),
                principal_id = request.admitted.principal.principal.id().unwrap_or("-"),
                "serving secured endpoint"
            );

            Ok(json_response(
                http::StatusCode::OK,
                &serde_json::json!({ "message": "Hello World" }),
            ))
        })
    }
}
