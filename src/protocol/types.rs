use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Default number of messages replayed to a joining session.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Default length (in characters) of a room's last-message summary.
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 50;
/// Marker appended to a truncated last-message summary.
pub const SUMMARY_ELLIPSIS: &str = "...";

/// Unique identifier for rooms
pub type RoomId = Uuid;
/// Unique identifier for persisted messages
pub type MessageId = Uuid;
/// Unique identifier for a live socket session
pub type SessionId = Uuid;
/// Identifier issued by the identity store; opaque to the chat core
pub type UserId = String;

/// Truncated preview of the most recent message in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageSummary {
    pub text: String,
    pub at: DateTime<Utc>,
}

impl LastMessageSummary {
    /// Build a summary, keeping the first `max_chars` characters and appending
    /// an ellipsis when the text is longer.
    pub fn from_text(text: &str, max_chars: usize, at: DateTime<Utc>) -> Self {
        let text = if text.chars().count() > max_chars {
            let mut preview: String = text.chars().take(max_chars).collect();
            preview.push_str(SUMMARY_ELLIPSIS);
            preview
        } else {
            text.to_string()
        };
        Self { text, at }
    }
}

/// A chat room and its persisted participant set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub participants: BTreeSet<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessageSummary>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, name: String) -> Self {
        Self {
            id,
            name,
            participants: BTreeSet::new(),
            last_message: None,
            created_at: Utc::now(),
        }
    }
}

/// Immutable stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Display fields for a message author, resolved from the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl AuthorInfo {
    /// Author record for a user the directory knows nothing about.
    pub fn unknown(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            login: None,
            avatar: None,
        }
    }
}

/// Message record as delivered to clients, with the author expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user: AuthorInfo,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: ChatMessage, user: AuthorInfo) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            user,
            text: message.text,
            created_at: message.created_at,
        }
    }
}
