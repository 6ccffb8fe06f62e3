//! API endpoint handlers.
//!
//! - `query` — `GET /api?action=...` read-through cached aggregations
//! - `mutate` — `POST /api` writes, each followed by a full cache flush
//! - `health` — liveness probe

pub mod health;
pub mod mutate;
pub mod query;

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{CacheStatus, CACHE_HEADER};
use crate::core_state::CoreState;

/// Run storage work on the blocking pool, bounded by the configured timeout.
///
/// `Ok(None)` means the bound elapsed. The task keeps running in the
/// background; its outcome is never reported to this caller.
pub(crate) async fn run_blocking<T, F>(
    core: &Arc<CoreState>,
    work: F,
) -> Result<Option<T>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&CoreState, &Connection) -> Result<T, ApiError> + Send + 'static,
{
    let state = Arc::clone(core);
    let task = tokio::task::spawn_blocking(move || {
        let conn = state.open_db()?;
        work(&state, &conn)
    });

    match tokio::time::timeout(core.query_timeout, task).await {
        Ok(Ok(result)) => result.map(Some),
        Ok(Err(join_err)) => Err(ApiError::Internal(format!("Blocking task failed: {join_err}"))),
        Err(_) => Ok(None),
    }
}

/// Serialize a response payload and mark it `ok: true`.
pub(crate) fn ok_body<T: Serialize>(payload: &T) -> Result<String, ApiError> {
    let mut value = serde_json::to_value(payload)?;
    match value.as_object_mut() {
        Some(map) => {
            map.insert("ok".into(), serde_json::Value::Bool(true));
        }
        None => {
            value = serde_json::json!({ "ok": true, "data": value });
        }
    }
    Ok(serde_json::to_string(&value)?)
}

/// Pre-serialized JSON response, optionally tagged with its cache outcome.
pub(crate) fn json_response(
    status: StatusCode,
    body: String,
    cache: Option<CacheStatus>,
) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(cache) = cache {
        headers.insert(CACHE_HEADER, HeaderValue::from_static(cache.as_str()));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        id: i64,
    }

    #[test]
    fn ok_body_adds_flag_to_objects() {
        let body = ok_body(&Payload { id: 7 }).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn ok_body_wraps_non_objects() {
        let body = ok_body(&vec![1, 2]).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn json_response_sets_cache_header() {
        let response = json_response(StatusCode::OK, "{}".into(), Some(CacheStatus::Hit));
        assert_eq!(response.headers().get(CACHE_HEADER).unwrap(), "HIT");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
