use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes carried on `error` events for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    AuthenticationRequired,
    InvalidToken,
    TokenExpired,

    // Validation
    InvalidInput,
    MessageTooLarge,

    // Rooms
    RoomNotFound,
    NotInRoom,

    // Server
    StorageError,
    InternalError,
}

impl ErrorCode {
    /// Human-readable description suitable for client logs.
    pub fn description(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => {
                "This connection requires a credential. Supply a token in the handshake."
            }
            Self::InvalidToken => {
                "The credential is invalid or malformed. Obtain a new token and reconnect."
            }
            Self::TokenExpired => "The credential has expired. Obtain a new token and reconnect.",
            Self::InvalidInput => {
                "The event payload is invalid or malformed. Check the event name and fields."
            }
            Self::MessageTooLarge => {
                "The message exceeds the maximum allowed size. Send a shorter message."
            }
            Self::RoomNotFound => "The requested room does not exist.",
            Self::NotInRoom => "You have not joined this room. Join it before sending messages.",
            Self::StorageError => {
                "A storage error occurred while processing your request. Please try again later."
            }
            Self::InternalError => "An internal server error occurred. Please try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
