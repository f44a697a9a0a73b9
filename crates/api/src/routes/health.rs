//! Liveness endpoints.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /: welcome message.
pub async fn welcome() -> Json<&'static str> {
    Json("Welcome to the API")
}

/// GET /health_check: plain liveness probe.
pub async fn health_check() -> Json<&'static str> {
    Json("Healthy")
}

/// GET /health: returns system health status.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
