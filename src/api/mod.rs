//! HTTP surface.
//!
//! `api_router()` returns a `Router` that can be mounted on any axum server
//! instance; `start_api_server()` binds and runs it.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
