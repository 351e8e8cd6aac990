use super::{ChatError, ChatServer};
use crate::protocol::SessionId;
use std::sync::Arc;

impl ChatServer {
    /// Send an `error` event to the session that caused it.
    pub(crate) fn report_error(&self, session_id: &SessionId, err: &ChatError) {
        match err {
            ChatError::Persistence(source) => {
                tracing::error!(%session_id, error = %source, "Storage operation failed");
            }
            other => {
                tracing::info!(
                    %session_id,
                    error = %other,
                    code = ?other.error_code(),
                    "Client event rejected"
                );
            }
        }
        self.registry
            .send_to(session_id, Arc::new(err.to_server_message()));
    }
}
