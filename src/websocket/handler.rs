use crate::auth::{extract_credential, HandshakeQuery};
use crate::server::ChatServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

/// WebSocket handler for the chat protocol.
///
/// The credential is verified before the upgrade; a rejected handshake gets a
/// plain 401 and never reaches the socket loop.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<ChatServer>>,
    Query(query): Query<HandshakeQuery>,
    headers: HeaderMap,
) -> Response {
    let credential = extract_credential(&headers, &query);
    let verdict = server
        .authenticator()
        .authenticate(credential.as_deref())
        .await;
    let identity = match verdict {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(client_addr = %addr, reason = %err, "WebSocket handshake rejected");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, server, identity, addr))
}
