use super::{ChatError, ChatServer, ConnectionRegistry};
use crate::database::ChatDatabase;
use crate::protocol::{
    validate_message_text, AuthorInfo, LastMessageSummary, MessageView, RoomId, ServerMessage,
    SessionId, UserId,
};
use std::sync::Arc;

impl ChatServer {
    /// Post a message from a live session. The session must have joined the
    /// room; otherwise nothing is persisted.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        room_id: RoomId,
        text: &str,
    ) -> Result<Option<MessageView>, ChatError> {
        let text = validate_message_text(text, self.config.max_text_length)?;
        let Some(user_id) = self.session_user(session_id) else {
            return Ok(None);
        };
        self.publish(&user_id, room_id, text, Some(session_id))
            .await
            .map(Some)
    }

    /// Post a message on behalf of an authenticated user without a live
    /// session (HTTP fallback). Live members still receive `receiveMessage`.
    pub async fn post_message(
        &self,
        user_id: &UserId,
        room_id: RoomId,
        text: &str,
    ) -> Result<MessageView, ChatError> {
        let text = validate_message_text(text, self.config.max_text_length)?;
        if self.database.find_room(&room_id).await?.is_none() {
            return Err(ChatError::RoomNotFound(room_id));
        }
        self.publish(user_id, room_id, text, None).await
    }

    /// Append, broadcast, then update the summary, all under the room lock so
    /// every member sees messages in append order.
    ///
    /// The sequence runs on its own task: once a message is stored it is
    /// always broadcast, even if the caller goes away mid-send.
    async fn publish(
        &self,
        user_id: &UserId,
        room_id: RoomId,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<MessageView, ChatError> {
        if let Some(session_id) = session_id {
            if !self.registry.is_member(session_id, &room_id) {
                return Err(ChatError::NotInRoom(room_id));
            }
        }

        let publication = Publication {
            database: Arc::clone(&self.database),
            registry: Arc::clone(&self.registry),
            session_id: session_id.copied(),
            user_id: user_id.clone(),
            room_id,
            text: text.to_string(),
            summary_max_chars: self.config.summary_max_chars,
        };
        tokio::spawn(publication.run()).await.map_err(|err| {
            ChatError::Persistence(anyhow::anyhow!("message publication aborted: {err}"))
        })?
    }

    /// Display fields for an author; storage failures degrade to the bare id.
    pub(crate) async fn resolve_author(&self, user_id: &UserId) -> AuthorInfo {
        resolve_author(self.database.as_ref(), user_id).await
    }
}

/// One message on its way from a sender to storage and the room.
struct Publication {
    database: Arc<dyn ChatDatabase>,
    registry: Arc<ConnectionRegistry>,
    session_id: Option<SessionId>,
    user_id: UserId,
    room_id: RoomId,
    text: String,
    summary_max_chars: usize,
}

impl Publication {
    async fn run(self) -> Result<MessageView, ChatError> {
        let room_id = self.room_id;
        let _room_guard = self.registry.lock_room(room_id).await;

        // Membership may have changed while waiting for the lock.
        if let Some(session_id) = &self.session_id {
            if !self.registry.is_member(session_id, &room_id) {
                return Err(ChatError::NotInRoom(room_id));
            }
        }

        let message = self
            .database
            .append_message(&room_id, &self.user_id, &self.text)
            .await?;
        let author = resolve_author(self.database.as_ref(), &self.user_id).await;
        let view = MessageView::new(message, author);

        let delivered = self.registry.broadcast(
            &room_id,
            Arc::new(ServerMessage::ReceiveMessage(view.clone())),
        );
        tracing::debug!(
            message_id = %view.id,
            %room_id,
            user_id = %self.user_id,
            delivered,
            "Message broadcast"
        );

        let summary =
            LastMessageSummary::from_text(&view.text, self.summary_max_chars, view.created_at);
        if let Err(err) = self.database.set_last_message(&room_id, summary).await {
            tracing::error!(%room_id, error = %err, "Failed to update last-message summary");
        }

        Ok(view)
    }
}

async fn resolve_author(database: &dyn ChatDatabase, user_id: &UserId) -> AuthorInfo {
    match database.resolve_author(user_id).await {
        Ok(author) => author,
        Err(err) => {
            tracing::warn!(%user_id, error = %err, "Failed to resolve author; using id only");
            AuthorInfo::unknown(user_id.clone())
        }
    }
}
