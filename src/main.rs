use std::sync::Arc;

use canvas_relay::routes;
use canvas_relay::services::content::{ContentClient, ContentConfig};
use canvas_relay::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8081".into())
        .parse()
        .expect("invalid PORT");

    // Content client is optional: realtime relaying works without the CMS.
    let content = match ContentConfig::from_env() {
        Some(config) => match ContentClient::new(config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "content client init failed, serving default content");
                None
            }
        },
        None => {
            tracing::info!("content client not configured, serving default content");
            None
        }
    };

    let state = AppState::new(content);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install shutdown handler");
    tracing::info!("shutdown signal received, closing connections");
}
