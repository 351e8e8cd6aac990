use thiserror::Error;

use crate::protocol::{ErrorCode, RoomId, ServerMessage, TextRejection};

/// Non-fatal failures of a chat operation, reported only to the session
/// that triggered them.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),
    #[error("You have not joined room {0}")]
    NotInRoom(RoomId),
    #[error("{0}")]
    MalformedPayload(String),
    #[error("{0}")]
    MessageTooLarge(String),
    /// Storage failed; details are logged, never sent to the client
    #[error("storage failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl ChatError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::NotInRoom(_) => ErrorCode::NotInRoom,
            Self::MalformedPayload(_) => ErrorCode::InvalidInput,
            Self::MessageTooLarge(_) => ErrorCode::MessageTooLarge,
            Self::Persistence(_) => ErrorCode::StorageError,
        }
    }

    /// Text safe to show the client.
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(_) => "Server Error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_server_message(&self) -> ServerMessage {
        ServerMessage::error(self.user_message(), self.error_code())
    }
}

impl From<TextRejection> for ChatError {
    fn from(rejection: TextRejection) -> Self {
        match rejection {
            TextRejection::Empty => Self::MalformedPayload(rejection.to_string()),
            TextRejection::TooLong { .. } => Self::MessageTooLarge(rejection.to_string()),
        }
    }
}
