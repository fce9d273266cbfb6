//! Liveness endpoint.

use axum::Json;
use serde::Serialize;

const PROJECT_NAME: &str = "jarvis-native-core";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub project: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        project: PROJECT_NAME,
    })
}
