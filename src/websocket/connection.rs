use crate::auth::Identity;
use crate::protocol::{ErrorCode, ServerMessage};
use crate::server::ChatServer;
use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::sending::send_text_message;

pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<ChatServer>,
    identity: Identity,
    addr: SocketAddr,
) {
    let (mut sender, mut receiver) = socket.split();
    let queue_capacity = server.config().outbound_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);

    let session_id = server.register_session(&identity, tx);
    tracing::info!(
        %session_id,
        user_id = %identity.user_id,
        client_addr = %addr,
        "WebSocket connection established"
    );

    // Outbound: drain the session queue in order.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_text_message(&mut sender, &message, &session_id)
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Inbound: events are handled one at a time, in arrival order. Closing
    // only interrupts the wait for the next frame, never an event in progress.
    let (closing_tx, mut closing_rx) = watch::channel(false);
    let server_clone = server.clone();
    let mut receive_task = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                biased;
                _ = closing_rx.changed() => break,
                next = receiver.next() => next,
            };
            let Some(msg) = next else {
                break;
            };
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%session_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    server_clone
                        .handle_text_frame(&session_id, text.as_str())
                        .await;
                }
                Message::Binary(_) => {
                    tracing::warn!(%session_id, "Binary frame rejected");
                    server_clone.registry().send_to(
                        &session_id,
                        Arc::new(ServerMessage::error(
                            "Binary frames are not supported",
                            ErrorCode::InvalidInput,
                        )),
                    );
                }
                Message::Close(_) => {
                    tracing::info!(%session_id, "WebSocket closed by client");
                    break;
                }
                // axum answers pings itself
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            let _ = closing_tx.send(true);
            if let Err(e) = receive_task.await {
                tracing::warn!(%session_id, "Receive task ended abnormally: {}", e);
            }
        }
        _ = &mut receive_task => send_task.abort(),
    }

    server.unregister_session(&session_id).await;
    tracing::info!(
        %session_id,
        user_id = %identity.user_id,
        "WebSocket connection closed"
    );
}
