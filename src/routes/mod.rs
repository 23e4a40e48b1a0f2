//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One axum router serves the realtime websocket endpoint, a liveness probe,
//! and the JSON content API consumed by the per-platform front-ends. CORS is
//! permissive: every platform origin talks to this single relay.

pub mod content;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the full application router.
#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/api/content/home", get(content::home_page))
        .route("/api/content/platforms", get(content::platform_configs))
        .route("/api/content/cache/clear", post(content::clear_cache))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
