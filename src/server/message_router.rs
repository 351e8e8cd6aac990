use crate::protocol::{ClientMessage, SessionId};

use super::{ChatError, ChatServer};

impl ChatServer {
    /// Decode one inbound text frame and dispatch it. Every failure is
    /// reported to this session only; the connection stays open.
    pub async fn handle_text_frame(&self, session_id: &SessionId, frame: &str) {
        let max_size = self.config.max_message_size;
        if frame.len() > max_size {
            tracing::warn!(
                %session_id,
                size = frame.len(),
                max = max_size,
                "Frame exceeds size limit"
            );
            self.report_error(
                session_id,
                &ChatError::MessageTooLarge(format!(
                    "Message too large ({} bytes, max {max_size} bytes)",
                    frame.len()
                )),
            );
            return;
        }

        match serde_json::from_str::<ClientMessage>(frame) {
            Ok(message) => self.handle_client_message(session_id, message).await,
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "Rejected malformed client frame");
                self.report_error(
                    session_id,
                    &ChatError::MalformedPayload(format!("Invalid message format: {err}")),
                );
            }
        }
    }

    /// Handle a decoded client event.
    pub async fn handle_client_message(&self, session_id: &SessionId, message: ClientMessage) {
        let event = message.event_name();
        let room_id = message.room_id();
        let result = match message {
            ClientMessage::JoinRoom { room_id } => self.join_room(session_id, room_id).await,
            ClientMessage::SendMessage { room_id, text } => self
                .send_message(session_id, room_id, &text)
                .await
                .map(|_| ()),
            ClientMessage::LeaveRoom { room_id } => self.leave_room(session_id, room_id).await,
        };

        if let Err(err) = result {
            tracing::debug!(%session_id, %room_id, event, "Client event failed");
            self.report_error(session_id, &err);
        }
    }
}
