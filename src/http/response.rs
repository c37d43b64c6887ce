//! JSON error responses.
//!
//! Every error leaves the gateway as `{"error": <message>}` with a matching
//! status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";
pub const SERVER_ERROR: &str =
    "the server encountered a problem and could not process your request";

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a str,
}

/// Build a JSON error response.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorEnvelope { error: message })).into_response()
}

pub fn rate_limit_exceeded() -> Response {
    error_response(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_EXCEEDED)
}

pub fn server_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limit_body_is_fixed() {
        let response = rate_limit_exceeded();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "rate limit exceeded" }));
    }

    #[test]
    fn server_error_status() {
        assert_eq!(server_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
