//! Service banner and health check.

use axum::Json;
use serde::Serialize;

use crate::config::{APP_NAME, APP_VERSION, SERVICE_ID};

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{APP_NAME} medication reconciliation API"),
        version: APP_VERSION,
    })
}

/// `GET /health`: liveness probe.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_ID,
        version: APP_VERSION,
    })
}
