use super::{ChatServer, ServerConfig};
use crate::auth::token::test_tokens::SECRET;
use crate::auth::{Authenticator, Identity};
use crate::database::{ChatDatabase, InMemoryDatabase, MessageStore, RoomStore, UserDirectory};
use crate::protocol::{
    AuthorInfo, ChatMessage, LastMessageSummary, Room, RoomId, ServerMessage, SessionId, UserId,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// In-memory store whose writes can be made to fail on demand.
#[derive(Default)]
pub(crate) struct FlakyDatabase {
    inner: InMemoryDatabase,
    pub fail_appends: AtomicBool,
    pub fail_participants: AtomicBool,
    pub fail_summaries: AtomicBool,
    pub slow_authors: AtomicBool,
}

/// How long author lookups stall when `slow_authors` is set.
pub(crate) const AUTHOR_DELAY: Duration = Duration::from_millis(150);

impl FlakyDatabase {
    fn check(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            bail!("simulated {what} failure");
        }
        Ok(())
    }
}

#[async_trait]
impl RoomStore for FlakyDatabase {
    async fn find_room(&self, room_id: &RoomId) -> Result<Option<Room>> {
        self.inner.find_room(room_id).await
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.inner.list_rooms().await
    }

    async fn ensure_room(&self, room_id: Option<RoomId>, name: &str) -> Result<Room> {
        self.inner.ensure_room(room_id, name).await
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        Self::check(&self.fail_participants, "participant")?;
        self.inner.add_participant(room_id, user_id).await
    }

    async fn remove_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        Self::check(&self.fail_participants, "participant")?;
        self.inner.remove_participant(room_id, user_id).await
    }

    async fn set_last_message(
        &self,
        room_id: &RoomId,
        summary: LastMessageSummary,
    ) -> Result<()> {
        Self::check(&self.fail_summaries, "summary")?;
        self.inner.set_last_message(room_id, summary).await
    }
}

#[async_trait]
impl MessageStore for FlakyDatabase {
    async fn append_message(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        text: &str,
    ) -> Result<ChatMessage> {
        Self::check(&self.fail_appends, "append")?;
        self.inner.append_message(room_id, user_id, text).await
    }

    async fn recent_messages(&self, room_id: &RoomId, limit: usize) -> Result<Vec<ChatMessage>> {
        self.inner.recent_messages(room_id, limit).await
    }

    async fn room_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>> {
        self.inner.room_history(room_id).await
    }
}

#[async_trait]
impl UserDirectory for FlakyDatabase {
    async fn resolve_author(&self, user_id: &UserId) -> Result<AuthorInfo> {
        if self.slow_authors.load(Ordering::SeqCst) {
            tokio::time::sleep(AUTHOR_DELAY).await;
        }
        self.inner.resolve_author(user_id).await
    }

    async fn upsert_user(&self, author: AuthorInfo) -> Result<()> {
        self.inner.upsert_user(author).await
    }
}

#[async_trait]
impl ChatDatabase for FlakyDatabase {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub(crate) fn server_with(
    database: Arc<dyn ChatDatabase>,
    config: ServerConfig,
) -> Arc<ChatServer> {
    ChatServer::new(config, database, Authenticator::jwt(SECRET, 0))
}

pub(crate) fn test_server() -> Arc<ChatServer> {
    server_with(Arc::new(InMemoryDatabase::new()), ServerConfig::default())
}

pub(crate) async fn create_room(server: &ChatServer, name: &str) -> RoomId {
    server
        .database()
        .ensure_room(None, name)
        .await
        .expect("room created")
        .id
}

pub(crate) fn connect(
    server: &ChatServer,
    user_id: &str,
) -> (SessionId, mpsc::Receiver<Arc<ServerMessage>>) {
    let (tx, rx) = mpsc::channel(64);
    let identity = Identity {
        user_id: user_id.to_string(),
    };
    (server.register_session(&identity, tx), rx)
}

/// Everything queued for a session so far.
pub(crate) fn drain(rx: &mut mpsc::Receiver<Arc<ServerMessage>>) -> Vec<ServerMessage> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event.as_ref().clone());
    }
    events
}
