//! API router.
//!
//! Routes:
//! - `GET  /api?action=...` — queries (read-through cached)
//! - `POST /api`            — mutations
//! - `GET  /api/health`     — liveness
//!
//! Layers (outermost → innermost): CORS → access log → handler.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router for a shared [`CoreState`].
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    Router::new()
        .route(
            "/api",
            get(endpoints::query::handle).post(endpoints::mutate::handle),
        )
        .route("/api/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        // Any origin may call; access is gated by the shared codes only.
        .layer(CorsLayer::permissive())
}

/// Core state over a migrated database in `dir`, with "today" pinned to
/// 2024-06-15, unit code `unit` and admin code `admin`.
#[cfg(test)]
pub(crate) fn test_core(dir: &tempfile::TempDir) -> Arc<CoreState> {
    test_core_with(dir, std::time::Duration::from_secs(30), std::time::Duration::from_secs(10))
}

#[cfg(test)]
pub(crate) fn test_core_with(
    dir: &tempfile::TempDir,
    ttl: std::time::Duration,
    timeout: std::time::Duration,
) -> Arc<CoreState> {
    use crate::core_state::Clock;
    use crate::query_cache::QueryCache;

    let path = dir.path().join("wardboard.db");
    crate::db::open_database(&path).unwrap();
    Arc::new(CoreState::new(
        path,
        QueryCache::new(ttl, 50),
        "unit".into(),
        "admin".into(),
        Clock::Fixed(chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        timeout,
        true,
    ))
}
