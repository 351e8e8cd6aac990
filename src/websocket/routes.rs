use crate::config::SecurityConfig;
use crate::server::ChatServer;
use axum::extract::State;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;

use super::api::{list_rooms, post_message, room_messages};
use super::handler::websocket_handler;

/// Create the Axum router with WebSocket support and the REST surface.
pub fn create_router(security: &SecurityConfig) -> axum::Router<Arc<ChatServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = match security.allowed_origins() {
        None => CorsLayer::permissive(),
        Some(configured) => {
            let origins: Vec<_> = configured
                .iter()
                .filter_map(|s| s.parse::<axum::http::HeaderValue>().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!("No valid CORS origins configured, using permissive CORS");
                CorsLayer::permissive()
            } else {
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{room_id}/messages", get(room_messages))
        .route("/messages", post(post_message))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check(
    State(server): State<Arc<ChatServer>>,
) -> axum::response::Result<&'static str> {
    if server.health_check().await {
        Ok("OK")
    } else {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE.into())
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn run_server(
    addr: SocketAddr,
    server: Arc<ChatServer>,
    security: &SecurityConfig,
) -> anyhow::Result<()> {
    let app = create_router(security).with_state(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting parley chat server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
