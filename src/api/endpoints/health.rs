//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health` — liveness probe. Touches neither cache nor storage.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        status: "ok",
        version: crate::config::APP_VERSION,
    })
}
