//! Storage abstraction for rooms, messages, and author display data.
//!
//! Every mutation that can race between sessions is a single store-level
//! operation (set insert/remove, append), never a read-modify-write done by
//! the caller.

use crate::config::{StorageBackend, StorageConfig};
use crate::protocol::{AuthorInfo, ChatMessage, LastMessageSummary, Room, RoomId, UserId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

mod memory;
mod sqlite;

pub use memory::InMemoryDatabase;
pub use sqlite::SqliteDatabase;

/// Durable chat rooms and their participant sets.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Get room by ID
    async fn find_room(&self, room_id: &RoomId) -> Result<Option<Room>>;

    /// All rooms, oldest first
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// Administrative creation. When `room_id` already exists the stored room
    /// is returned unchanged.
    async fn ensure_room(&self, room_id: Option<RoomId>, name: &str) -> Result<Room>;

    /// Add a participant. Returns `false` when the user was already present.
    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool>;

    /// Remove a participant. Returns `false` when the user was not present.
    async fn remove_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool>;

    async fn set_last_message(&self, room_id: &RoomId, summary: LastMessageSummary)
        -> Result<()>;
}

/// Append-only message log, one ordered stream per room.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message, assigning its id and a creation time strictly after
    /// every earlier message in the same room.
    async fn append_message(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        text: &str,
    ) -> Result<ChatMessage>;

    /// The most recent `limit` messages of a room, oldest first.
    async fn recent_messages(&self, room_id: &RoomId, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Every message of a room, oldest first.
    async fn room_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>>;
}

/// Read side of the identity store: display fields for message authors.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Unknown users resolve to an [`AuthorInfo`] carrying only the id.
    async fn resolve_author(&self, user_id: &UserId) -> Result<AuthorInfo>;

    async fn upsert_user(&self, author: AuthorInfo) -> Result<()>;
}

/// Everything the chat server needs from storage.
#[async_trait]
pub trait ChatDatabase: RoomStore + MessageStore + UserDirectory {
    /// Prepare schema / connections
    async fn initialize(&self) -> Result<()>;

    async fn health_check(&self) -> bool;
}

/// Storage backend selection.
#[derive(Debug, Clone, Default)]
pub enum DatabaseConfig {
    #[default]
    InMemory,
    Sqlite {
        url: String,
        max_connections: u32,
    },
}

impl DatabaseConfig {
    pub fn from_storage_config(cfg: &StorageConfig) -> Result<Self> {
        match cfg.backend {
            StorageBackend::InMemory => Ok(Self::InMemory),
            StorageBackend::Sqlite => {
                let url = cfg
                    .sqlite_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| {
                        anyhow::anyhow!("storage.sqlite_url is required for the sqlite backend")
                    })?;
                Ok(Self::Sqlite {
                    url: url.to_string(),
                    max_connections: cfg.max_connections.max(1),
                })
            }
        }
    }
}

/// Create and initialize a database instance based on configuration
pub async fn create_database(config: DatabaseConfig) -> Result<Arc<dyn ChatDatabase>> {
    let db: Arc<dyn ChatDatabase> = match config {
        DatabaseConfig::InMemory => Arc::new(InMemoryDatabase::new()),
        DatabaseConfig::Sqlite {
            url,
            max_connections,
        } => Arc::new(SqliteDatabase::connect(&url, max_connections).await?),
    };
    db.initialize().await?;
    Ok(db)
}

/// Apply configured rooms and users. Safe to run on every start: rooms with a
/// fixed id are matched by id, the others by name.
pub async fn seed(db: &dyn ChatDatabase, cfg: &StorageConfig) -> Result<()> {
    let existing = db.list_rooms().await?;
    for room in &cfg.rooms {
        if room.id.is_none() && existing.iter().any(|r| r.name == room.name) {
            continue;
        }
        let created = db.ensure_room(room.id, &room.name).await?;
        tracing::info!(room_id = %created.id, name = %created.name, "Room available");
    }

    for user in &cfg.users {
        db.upsert_user(AuthorInfo {
            id: user.id.clone(),
            login: Some(user.login.clone()),
            avatar: user.avatar.clone(),
        })
        .await?;
    }

    Ok(())
}

/// Current time truncated to microseconds, the precision every backend stores.
pub(crate) fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Creation time for the next message in a room whose latest message was
/// created at `previous`.
pub(crate) fn next_message_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = now_micros();
    match previous {
        Some(previous) if previous >= now => previous + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests;
