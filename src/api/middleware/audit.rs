//! Access logging middleware.
//!
//! Logs every request with method, path, action, status, latency and a
//! per-request id. The id is also returned in `x-request-id`.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::ActionTag;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let started = Instant::now();
    let request_id = Uuid::new_v4();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let action = response
        .extensions()
        .get::<ActionTag>()
        .map(|tag| tag.0.clone())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "-".to_string());
    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;

    if status >= 500 {
        tracing::warn!(
            %request_id, %method, %path, %action, status, latency_ms,
            "API request failed"
        );
    } else {
        tracing::info!(%request_id, %method, %path, %action, status, latency_ms, "API request");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
