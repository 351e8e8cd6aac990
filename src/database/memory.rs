use super::{next_message_timestamp, now_micros, ChatDatabase, MessageStore, RoomStore, UserDirectory};
use crate::protocol::{AuthorInfo, ChatMessage, LastMessageSummary, Room, RoomId, UserId};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Simple in-memory database for tests and single-instance deployments
pub struct InMemoryDatabase {
    rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    /// Per-room message log, kept in append order
    messages: Arc<RwLock<HashMap<RoomId, Vec<ChatMessage>>>>,
    users: Arc<RwLock<HashMap<UserId, AuthorInfo>>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            messages: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for InMemoryDatabase {
    async fn find_room(&self, room_id: &RoomId) -> Result<Option<Room>> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let mut rooms: Vec<Room> = self.rooms.read().await.values().cloned().collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn ensure_room(&self, room_id: Option<RoomId>, name: &str) -> Result<Room> {
        let id = room_id.unwrap_or_else(Uuid::new_v4);
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(id).or_insert_with(|| {
            let mut room = Room::new(id, name.to_string());
            room.created_at = now_micros();
            room
        });
        Ok(room.clone())
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            bail!("Room not found: {room_id}");
        };
        Ok(room.participants.insert(user_id.clone()))
    }

    async fn remove_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            bail!("Room not found: {room_id}");
        };
        Ok(room.participants.remove(user_id))
    }

    async fn set_last_message(
        &self,
        room_id: &RoomId,
        summary: LastMessageSummary,
    ) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            bail!("Room not found: {room_id}");
        };
        room.last_message = Some(summary);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryDatabase {
    async fn append_message(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        text: &str,
    ) -> Result<ChatMessage> {
        // Lock ordering: rooms before messages
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(room_id) {
            bail!("Room not found: {room_id}");
        }

        let mut messages = self.messages.write().await;
        let log = messages.entry(*room_id).or_default();
        let message = ChatMessage {
            id: Uuid::new_v4(),
            room_id: *room_id,
            user_id: user_id.clone(),
            text: text.to_string(),
            created_at: next_message_timestamp(log.last().map(|m| m.created_at)),
        };
        log.push(message.clone());
        Ok(message)
    }

    async fn recent_messages(&self, room_id: &RoomId, limit: usize) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.read().await;
        let log = messages.get(room_id).map(Vec::as_slice).unwrap_or_default();
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }

    async fn room_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>> {
        Ok(self
            .messages
            .read()
            .await
            .get(room_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDatabase {
    async fn resolve_author(&self, user_id: &UserId) -> Result<AuthorInfo> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| AuthorInfo::unknown(user_id.clone())))
    }

    async fn upsert_user(&self, author: AuthorInfo) -> Result<()> {
        self.users.write().await.insert(author.id.clone(), author);
        Ok(())
    }
}

#[async_trait]
impl ChatDatabase for InMemoryDatabase {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
