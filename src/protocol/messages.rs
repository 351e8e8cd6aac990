use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{MessageView, RoomId, UserId};

/// Events sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Join an existing room and receive its recent history
    JoinRoom { room_id: RoomId },
    /// Post a message to a room the session has joined
    SendMessage { room_id: RoomId, text: String },
    /// Leave a room
    LeaveRoom { room_id: RoomId },
}

impl ClientMessage {
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::JoinRoom { room_id }
            | Self::SendMessage { room_id, .. }
            | Self::LeaveRoom { room_id } => *room_id,
        }
    }

    /// Event name as it appears on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "joinRoom",
            Self::SendMessage { .. } => "sendMessage",
            Self::LeaveRoom { .. } => "leaveRoom",
        }
    }
}

/// Events sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Recent history, delivered only to the session that joined
    LoadMessages {
        room_id: RoomId,
        messages: Vec<MessageView>,
    },
    /// Another user joined a room this session is in
    UserJoined {
        user_id: UserId,
        room_id: RoomId,
        message: String,
    },
    /// A new message in a room this session is in
    ReceiveMessage(MessageView),
    /// Another user left a room this session is in
    UserLeft {
        user_id: UserId,
        room_id: RoomId,
        message: String,
    },
    /// Failure scoped to the session that triggered it
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>, error_code: ErrorCode) -> Self {
        Self::Error {
            message: message.into(),
            error_code: Some(error_code),
        }
    }

    pub fn user_joined(user_id: UserId, room_id: RoomId, room_name: &str) -> Self {
        Self::UserJoined {
            user_id,
            room_id,
            message: format!("User joined room {room_name}"),
        }
    }

    pub fn user_left(user_id: UserId, room_id: RoomId) -> Self {
        Self::UserLeft {
            user_id,
            room_id,
            message: format!("User left room {room_id}"),
        }
    }
}
