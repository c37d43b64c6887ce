//! Liveness endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
}

/// `GET /v1/healthcheck`
pub async fn healthcheck_handler(State(env): State<String>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "available",
        environment: env,
        version: VERSION,
    })
}
