//! Content API handlers.
//!
//! Thin translation layer over the content client. When the client is not
//! configured, or the upstream fails with nothing cached, the home page
//! falls back to the built-in defaults so front-ends always have something
//! to render.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::Value;
use tracing::warn;

use crate::services::content;
use crate::state::AppState;

pub async fn home_page(State(state): State<AppState>) -> Json<Value> {
    let Some(client) = &state.content else {
        return Json(content::default_home_page());
    };
    match client.fetch_home_page().await {
        Ok(value) => Json(value),
        Err(e) => {
            warn!(error = %e, "home page content unavailable, serving defaults");
            Json(content::default_home_page())
        }
    }
}

pub async fn platform_configs(State(state): State<AppState>) -> Json<Vec<Value>> {
    let Some(client) = &state.content else {
        return Json(Vec::new());
    };
    match client.fetch_platform_configs().await {
        Ok(configs) => Json(configs),
        Err(e) => {
            warn!(error = %e, "platform configs unavailable");
            Json(Vec::new())
        }
    }
}

pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    if let Some(client) = &state.content {
        client.clear_cache();
    }
    StatusCode::NO_CONTENT
}

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;
