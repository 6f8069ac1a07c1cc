//! Search HTTP endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=&from=&size=&fields=` | Ranked hits as JSON |
//! | `GET`  | `/health` | Liveness probe, returns `OK` |
//!
//! Other methods answer `405`. Errors are JSON objects
//! `{"code": 400, "status": "Bad Request", "message": "..."}`.

mod handlers;
mod response;

pub use handlers::{parse_query_param_positive, SearchParams};
pub use response::ApiError;

use axum::{
    body::Body,
    http::{header::USER_AGENT, Request},
    routing::get,
    Router,
};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

use crate::AppError;
use stars_search_repository::SearchIndexClient;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    search: SearchIndexClient,
    /// Deadline of a single search.
    search_timeout: Duration,
}

impl AppState {
    pub fn new(search: SearchIndexClient, search_timeout: Duration) -> Self {
        Self {
            search,
            search_timeout,
        }
    }
}

/// Build the router with request tracing and panic recovery.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/search",
            get(handlers::search_handler).options(handlers::options_handler),
        )
        .route(
            "/health",
            get(handlers::health_handler).options(handlers::options_handler),
        )
        .layer(CatchPanicLayer::new())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let user_agent = request
                    .headers()
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::debug_span!(
                    "request",
                    component = "server",
                    method = %request.method(),
                    uri = %request.uri(),
                    user_agent = %user_agent,
                )
            }),
        )
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves, then drain
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "Starting HTTP server");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
