use super::{now_micros, ChatDatabase, MessageStore, RoomStore, UserDirectory};
use crate::protocol::{AuthorInfo, ChatMessage, LastMessageSummary, Room, RoomId, UserId};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        last_message TEXT,
        last_message_at INTEGER,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS room_participants (
        room_id TEXT NOT NULL REFERENCES rooms(id),
        user_id TEXT NOT NULL,
        PRIMARY KEY (room_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        room_id TEXT NOT NULL REFERENCES rooms(id),
        user_id TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_room_created
        ON messages (room_id, created_at, seq)",
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        login TEXT,
        avatar TEXT
    )",
];

type RoomRow = (String, String, Option<String>, Option<i64>, i64);
type MessageRow = (String, String, String, String, i64);

/// SQLite-backed storage. Timestamps are stored as integer microseconds.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid sqlite url: {url}"))?
            .create_if_missing(true);

        // Every connection to `:memory:` opens its own database, so the pool
        // must hold exactly one connection for its whole lifetime.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open sqlite database at {url}"))?;

        tracing::info!(url, in_memory, "Connected to sqlite storage");
        Ok(Self { pool })
    }

    async fn participants_of(&self, room_id: &RoomId) -> Result<BTreeSet<UserId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM room_participants WHERE room_id = ?")
                .bind(room_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    async fn room_exists(&self, room_id: &RoomId) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM rooms WHERE id = ?")
            .bind(room_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("corrupt uuid in storage: {raw}"))
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| anyhow!("timestamp out of range in storage: {micros}"))
}

fn room_from_row(row: RoomRow, participants: BTreeSet<UserId>) -> Result<Room> {
    let (id, name, last_text, last_at, created_at) = row;
    let last_message = match (last_text, last_at) {
        (Some(text), Some(at)) => Some(LastMessageSummary {
            text,
            at: from_micros(at)?,
        }),
        _ => None,
    };
    Ok(Room {
        id: parse_uuid(&id)?,
        name,
        participants,
        last_message,
        created_at: from_micros(created_at)?,
    })
}

fn message_from_row(row: MessageRow) -> Result<ChatMessage> {
    let (id, room_id, user_id, text, created_at) = row;
    Ok(ChatMessage {
        id: parse_uuid(&id)?,
        room_id: parse_uuid(&room_id)?,
        user_id,
        text,
        created_at: from_micros(created_at)?,
    })
}

#[async_trait]
impl RoomStore for SqliteDatabase {
    async fn find_room(&self, room_id: &RoomId) -> Result<Option<Room>> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT id, name, last_message, last_message_at, created_at FROM rooms WHERE id = ?",
        )
        .bind(room_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let participants = self.participants_of(room_id).await?;
                Ok(Some(room_from_row(row, participants)?))
            }
            None => Ok(None),
        }
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rows: Vec<RoomRow> = sqlx::query_as(
            "SELECT id, name, last_message, last_message_at, created_at FROM rooms
             ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let memberships: Vec<(String, String)> =
            sqlx::query_as("SELECT room_id, user_id FROM room_participants")
                .fetch_all(&self.pool)
                .await?;
        let mut by_room: HashMap<String, BTreeSet<UserId>> = HashMap::new();
        for (room_id, user_id) in memberships {
            by_room.entry(room_id).or_default().insert(user_id);
        }

        rows.into_iter()
            .map(|row| {
                let participants = by_room.remove(&row.0).unwrap_or_default();
                room_from_row(row, participants)
            })
            .collect()
    }

    async fn ensure_room(&self, room_id: Option<RoomId>, name: &str) -> Result<Room> {
        let id = room_id.unwrap_or_else(Uuid::new_v4);
        sqlx::query(
            "INSERT INTO rooms (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(now_micros().timestamp_micros())
        .execute(&self.pool)
        .await?;

        self.find_room(&id)
            .await?
            .ok_or_else(|| anyhow!("room {id} vanished after insert"))
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        if !self.room_exists(room_id).await? {
            bail!("Room not found: {room_id}");
        }
        let result =
            sqlx::query("INSERT OR IGNORE INTO room_participants (room_id, user_id) VALUES (?, ?)")
                .bind(room_id.to_string())
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        if !self.room_exists(room_id).await? {
            bail!("Room not found: {room_id}");
        }
        let result = sqlx::query("DELETE FROM room_participants WHERE room_id = ? AND user_id = ?")
            .bind(room_id.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_last_message(
        &self,
        room_id: &RoomId,
        summary: LastMessageSummary,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE rooms SET last_message = ?, last_message_at = ? WHERE id = ?")
                .bind(&summary.text)
                .bind(summary.at.timestamp_micros())
                .bind(room_id.to_string())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            bail!("Room not found: {room_id}");
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteDatabase {
    async fn append_message(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        text: &str,
    ) -> Result<ChatMessage> {
        if !self.room_exists(room_id).await? {
            bail!("Room not found: {room_id}");
        }

        let id = Uuid::new_v4();
        // created_at is computed inside the statement so it is strictly
        // greater than every earlier message in the room.
        let (created_at,): (i64,) = sqlx::query_as(
            "INSERT INTO messages (id, room_id, user_id, text, created_at)
             SELECT ?, ?, ?, ?, MAX(?, COALESCE(MAX(created_at) + 1, 0))
             FROM messages WHERE room_id = ?
             RETURNING created_at",
        )
        .bind(id.to_string())
        .bind(room_id.to_string())
        .bind(user_id)
        .bind(text)
        .bind(now_micros().timestamp_micros())
        .bind(room_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(ChatMessage {
            id,
            room_id: *room_id,
            user_id: user_id.clone(),
            text: text.to_string(),
            created_at: from_micros(created_at)?,
        })
    }

    async fn recent_messages(&self, room_id: &RoomId, limit: usize) -> Result<Vec<ChatMessage>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, room_id, user_id, text, created_at FROM (
                 SELECT id, room_id, user_id, text, created_at, seq FROM messages
                 WHERE room_id = ?
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?
             ) ORDER BY created_at ASC, seq ASC",
        )
        .bind(room_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn room_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, room_id, user_id, text, created_at FROM messages
             WHERE room_id = ? ORDER BY created_at ASC, seq ASC",
        )
        .bind(room_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }
}

#[async_trait]
impl UserDirectory for SqliteDatabase {
    async fn resolve_author(&self, user_id: &UserId) -> Result<AuthorInfo> {
        let row: Option<(String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT id, login, avatar FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((id, login, avatar)) => AuthorInfo { id, login, avatar },
            None => AuthorInfo::unknown(user_id.clone()),
        })
    }

    async fn upsert_user(&self, author: AuthorInfo) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, login, avatar) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET login = excluded.login, avatar = excluded.avatar",
        )
        .bind(&author.id)
        .bind(&author.login)
        .bind(&author.avatar)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatDatabase for SqliteDatabase {
    async fn initialize(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        tracing::debug!("sqlite schema ready");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "sqlite health check failed");
                false
            }
        }
    }
}
