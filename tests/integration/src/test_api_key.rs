//! Service API key scenarios.

#[cfg(test)]
mod tests {
    use tenantguard_core::{AuthorizationCriteria, GuardConfig, Role};

    use crate::{DEMO_API_KEY, Harness, READ_ONLY_API_KEY, SECURED_PATH, request};

    #[tokio::test]
    async fn test_should_allow_api_key_with_required_scope() {
        let harness = Harness::new();
        let resp = harness
            .send(request("GET", SECURED_PATH, &[("x-api-key", DEMO_API_KEY)]))
            .await;

        assert_eq!(resp.status, http::StatusCode::OK);
        assert_eq!(resp.json, serde_json::json!({ "message": "Hello World" }));
    }

    #[tokio::test]
    async fn test_should_reject_invalid_tenant_with_valid_credential() {
        let harness = Harness::new();
        let resp = harness
            .send(request(
                "GET",
                "/api/tenant/invalid/secured",
                &[("x-api-key", DEMO_API_KEY)],
            ))
            .await;

        assert_eq!(resp.status, http::StatusCode::BAD_REQUEST);
        assert_eq!(resp.json, serde_json::json!({ "error": "Invalid tenantId" }));
    }

    #[tokio::test]
    async fn test_should_forbid_unknown_api_key() {
        let harness = Harness::new();
        let resp = harness
            .send(request("GET", SECURED_PATH, &[("x-api-key", "not-a-key")]))
            .await;

        assert_eq!(resp.status, http::StatusCode::FORBIDDEN);
        assert_eq!(resp.error(), Some("Forbidden"));
    }

    #[tokio::test]
    async fn test_should_forbid_api_key_in_other_tenant() {
        let harness = Harness::new();
        let resp = harness
            .send(request(
                "GET",
                "/api/tenant/2/secured",
                &[("x-api-key", DEMO_API_KEY)],
            ))
            .await;

        assert_eq!(resp.status, http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_enforce_scope_per_endpoint() {
        let cancel = Harness::builder()
            .criteria(AuthorizationCriteria::new(
                Vec::<Role>::new(),
                ["appointments:cancel"],
            ))
            .build();
        let resp = cancel
            .send(request(
                "POST",
                SECURED_PATH,
                &[("x-api-key", READ_ONLY_API_KEY)],
            ))
            .await;
        assert_eq!(resp.status, http::StatusCode::FORBIDDEN);

        let get = Harness::new();
        let resp = get
            .send(request(
                "GET",
                SECURED_PATH,
                &[("x-api-key", READ_ONLY_API_KEY)],
            ))
            .await;
        assert_eq!(resp.status, http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_report_missing_api_key_configuration() {
        let harness = Harness::builder().config(GuardConfig::default()).build();
        let resp = harness
            .send(request("GET", SECURED_PATH, &[("x-api-key", DEMO_API_KEY)]))
            .await;

        assert_eq!(resp.status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.error(),
            Some("Missing DEMO_API_KEY environment variable")
        );
    }
}
