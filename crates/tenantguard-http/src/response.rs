//! JSON response helpers.

use bytes::Bytes;
use http_body_util::Full;

use crate::error::GuardError;

/// Response body of every guarded endpoint. Payloads are always buffered.
pub type GuardResponseBody = Full<Bytes>;

/// Content type of every guard response.
pub const CONTENT_TYPE: &str = "application/json";

/// Serialize an error as `{"error": <message>}`.
#[must_use]
pub fn error_to_json(error: &GuardError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "error": error.to_string() }))
        .expect("JSON serialization of error cannot fail")
}

/// Convert a [`GuardError`] into a complete HTTP response.
#[must_use]
pub fn error_to_response(error: &GuardError) -> http::Response<GuardResponseBody> {
    let status = http::StatusCode::from_u16(error.status_code())
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(Full::new(Bytes::from(error_to_json(error))))
        .expect("valid error response")
}

/// Build a JSON response with the given status.
#[must_use]
pub fn json_response(
    status: http::StatusCode,
    value: &serde_json::Value,
) -> http::Response<GuardResponseBody> {
    let json = serde_json::to_vec(value).expect("JSON serialization of a Value cannot fail");

    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(Full::new(Bytes::from(json)))
        .expect("valid JSON response")
}
