//! HMAC-signed request scenarios.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tenantguard_core::{GuardConfig, HmacConfig, TenantId};

    use crate::{Harness, NOW, SECURED_PATH, request};

    const BODY: &[u8] = br#"{"appointment":"2024-01-01T10:00:00Z"}"#;

    #[tokio::test]
    async fn test_should_allow_signed_post_with_fresh_nonce() {
        let harness = Harness::new();
        let resp = harness
            .send(harness.signed("POST", SECURED_PATH, BODY, "0123456789abcdef"))
            .await;

        assert_eq!(resp.status, http::StatusCode::OK);
        assert_eq!(resp.json, serde_json::json!({ "message": "Hello World" }));
    }

    #[tokio::test]
    async fn test_should_reject_replayed_nonce() {
        let harness = Harness::new();
        let first = harness
            .send(harness.signed("POST", SECURED_PATH, BODY, "0123456789abcdef"))
            .await;
        assert_eq!(first.status, http::StatusCode::OK);

        harness.clock().advance(1_000);
        let replay = harness
            .send(harness.signed("POST", SECURED_PATH, BODY, "0123456789abcdef"))
            .await;
        assert_eq!(replay.status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            replay.json,
            serde_json::json!({ "error": "Nonce already seen" })
        );
    }

    #[tokio::test]
    async fn test_should_reject_replay_regardless_of_signature() {
        let harness = Harness::new();
        harness
            .send(harness.signed("POST", SECURED_PATH, BODY, "0123456789abcdef"))
            .await;

        let now = NOW.to_string();
        let forged = request(
            "POST",
            SECURED_PATH,
            &[
                ("x-signature", "AAAA"),
                ("x-signature-alg", "sha256"),
                ("x-timestamp", now.as_str()),
                ("x-nonce", "0123456789abcdef"),
            ],
        );
        let resp = harness.send(forged).await;
        assert_eq!(resp.error(), Some("Nonce already seen"));
    }

    #[tokio::test]
    async fn test_should_reject_future_dated_replay_after_skew_elapses() {
        let harness = Harness::new();
        // Signing is deterministic, so both calls yield the same bytes.
        let captured =
            || harness.signed_at("POST", SECURED_PATH, BODY, "future-nonce-1", NOW + 30_000);

        let first = harness.send(captured()).await;
        assert_eq!(first.status, http::StatusCode::OK);

        harness.clock().advance(30_001);
        let replay = harness.send(captured()).await;
        assert_eq!(replay.status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            replay.json,
            serde_json::json!({ "error": "Nonce already seen" })
        );
    }

    #[tokio::test]
    async fn test_should_reject_timestamp_beyond_skew_even_with_valid_signature() {
        let harness = Harness::new();
        for timestamp in [NOW - 30_001, NOW + 30_001] {
            let resp = harness
                .send(harness.signed_at(
                    "POST",
                    SECURED_PATH,
                    BODY,
                    &format!("nonce-{timestamp}"),
                    timestamp,
                ))
                .await;
            assert_eq!(resp.status, http::StatusCode::UNAUTHORIZED);
            assert_eq!(resp.error(), Some("Timestamp outside allowed skew"));
        }
    }

    #[tokio::test]
    async fn test_should_reject_any_mutated_body_byte() {
        let harness = Harness::new();
        for (i, nonce) in ["mutation-0", "mutation-1", "mutation-2"].iter().enumerate() {
            let signed = harness.signed("POST", SECURED_PATH, BODY, nonce);
            let (parts, body) = signed.into_parts();
            let mut mutated = body.to_vec();
            mutated[i * 7] ^= 0x01;

            let resp = harness
                .send(http::Request::from_parts(parts, Bytes::from(mutated)))
                .await;
            assert_eq!(resp.status, http::StatusCode::UNAUTHORIZED);
            assert_eq!(resp.error(), Some("Invalid HMAC signature"));
        }
    }

    #[tokio::test]
    async fn test_should_answer_unknown_route_without_consuming_nonce() {
        let harness = Harness::new();
        let missing = harness
            .send(harness.signed("POST", "/api/tenant/1/missing", BODY, "route-nonce-1"))
            .await;
        assert_eq!(missing.status, http::StatusCode::NOT_FOUND);

        let resp = harness
            .send(harness.signed("POST", SECURED_PATH, BODY, "route-nonce-1"))
            .await;
        assert_eq!(resp.status, http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_reject_signature_for_other_path() {
        let harness = Harness::new();
        let signed = harness.signed("POST", "/api/tenant/2/secured", BODY, "0123456789abcdef");
        let (mut parts, body) = signed.into_parts();
        parts.uri = http::Uri::from_static(SECURED_PATH);

        let resp = harness.send(http::Request::from_parts(parts, body)).await;
        assert_eq!(resp.error(), Some("Invalid HMAC signature"));
    }

    #[tokio::test]
    async fn test_should_validate_signing_headers() {
        let harness = Harness::new();
        let now = NOW.to_string();
        let now = now.as_str();

        let cases: [(&[(&str, &str)], &str); 4] = [
            (
                &[
                    ("x-signature", "c2ln"),
                    ("x-signature-alg", "sha1"),
                    ("x-timestamp", now),
                    ("x-nonce", "0123456789abcdef"),
                ],
                "Unsupported signature algorithm",
            ),
            (
                &[
                    ("x-signature", "c2ln"),
                    ("x-signature-alg", "sha256"),
                    ("x-timestamp", "yesterday"),
                    ("x-nonce", "0123456789abcdef"),
                ],
                "Invalid timestamp",
            ),
            (
                &[
                    ("x-signature", "c2ln"),
                    ("x-signature-alg", "sha256"),
                    ("x-timestamp", now),
                ],
                "Invalid nonce",
            ),
            (
                &[
                    ("x-signature", "!!not-base64!!"),
                    ("x-signature-alg", "sha256"),
                    ("x-timestamp", now),
                    ("x-nonce", "fedcba9876543210"),
                ],
                "Malformed signature",
            ),
        ];

        for (headers, message) in cases {
            let resp = harness.send(request("GET", SECURED_PATH, headers)).await;
            assert_eq!(resp.status, http::StatusCode::BAD_REQUEST, "{message}");
            assert_eq!(resp.error(), Some(message));
        }
    }

    #[tokio::test]
    async fn test_should_forbid_signed_request_for_unprovisioned_tenant() {
        let harness = Harness::new();
        let path = "/api/tenant/2/secured";
        let resp = harness
            .send(harness.signed("GET", path, b"", "0123456789abcdef"))
            .await;
        assert_eq!(resp.status, http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_allow_signed_request_for_each_provisioned_tenant() {
        let config = GuardConfig {
            hmac: Some(HmacConfig::new(
                crate::HMAC_SECRET,
                [TenantId::new(1), TenantId::new(2)],
            )),
            ..crate::test_config()
        };
        let harness = Harness::builder().config(config).build();
        for (tenant, nonce) in [(1, "tenant-one-nonce"), (2, "tenant-two-nonce")] {
            let path = format!("/api/tenant/{tenant}/secured");
            let resp = harness.send(harness.signed("GET", &path, b"", nonce)).await;
            assert_eq!(resp.status, http::StatusCode::OK, "tenant {tenant}");
        }
    }

    #[tokio::test]
    async fn test_should_report_missing_hmac_secret() {
        let config = GuardConfig {
            hmac: None,
            ..crate::test_config()
        };
        let harness = Harness::builder().config(config).build();
        let resp = harness
            .send(harness.signed("GET", SECURED_PATH, b"", "0123456789abcdef"))
            .await;
        assert_eq!(resp.status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.error(), Some("Missing DEMO_HMAC_KEY environment variable"));
    }

    #[tokio::test]
    async fn test_should_admit_exactly_one_of_concurrent_replays() {
        let harness = std::sync::Arc::new(Harness::new());
        let requests: Vec<_> = (0..16)
            .map(|_| harness.signed("POST", SECURED_PATH, BODY, "concurrent-nonce"))
            .collect();

        let responses = futures::future::join_all(requests.into_iter().map(|req| {
            let harness = std::sync::Arc::clone(&harness);
            tokio::spawn(async move { harness.send(req).await.status })
        }))
        .await;

        let ok = responses
            .into_iter()
            .map(|r| r.unwrap())
            .filter(|s| *s == http::StatusCode::OK)
            .count();
        assert_eq!(ok, 1);
    }
}
