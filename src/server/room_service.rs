use super::{ChatError, ChatServer};
use crate::protocol::{
    AuthorInfo, ChatMessage, MessageView, Room, RoomId, ServerMessage, SessionId, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;

impl ChatServer {
    /// Join an existing room and replay its recent history to the joiner.
    ///
    /// Effects, in order: registry membership, persisted participant,
    /// `userJoined` to the other members, `loadMessages` to the joiner. All of
    /// them run under the room's lock so the history and the broadcasts that
    /// follow neither overlap nor leave a gap.
    pub async fn join_room(
        &self,
        session_id: &SessionId,
        room_id: RoomId,
    ) -> Result<(), ChatError> {
        let Some(user_id) = self.session_user(session_id) else {
            return Ok(());
        };

        let room = self
            .database
            .find_room(&room_id)
            .await?
            .ok_or(ChatError::RoomNotFound(room_id))?;

        let _room_guard = self.registry.lock_room(room_id).await;

        let newly_joined = self.registry.join_room(session_id, room_id);
        if let Err(err) = self.database.add_participant(&room_id, &user_id).await {
            if newly_joined {
                self.registry.leave_room(session_id, &room_id);
            }
            return Err(err.into());
        }

        if newly_joined {
            let notice = ServerMessage::user_joined(user_id.clone(), room_id, &room.name);
            self.registry
                .broadcast_except(&room_id, session_id, Arc::new(notice));
        }

        let messages = self.recent_history(&room_id).await?;
        tracing::info!(
            %session_id,
            %user_id,
            %room_id,
            history = messages.len(),
            newly_joined,
            "Session joined room"
        );
        self.registry.send_to(
            session_id,
            Arc::new(ServerMessage::LoadMessages { room_id, messages }),
        );
        Ok(())
    }

    /// Leave a room. Leaving a room the session never joined is a no-op.
    pub async fn leave_room(
        &self,
        session_id: &SessionId,
        room_id: RoomId,
    ) -> Result<(), ChatError> {
        let Some(user_id) = self.session_user(session_id) else {
            return Ok(());
        };

        if !self.registry.is_member(session_id, &room_id) {
            tracing::debug!(%session_id, %room_id, "Leave for room not joined ignored");
            return Ok(());
        }

        let _room_guard = self.registry.lock_room(room_id).await;
        if !self.registry.leave_room(session_id, &room_id) {
            return Ok(());
        }

        self.database.remove_participant(&room_id, &user_id).await?;
        let notice = ServerMessage::user_left(user_id.clone(), room_id);
        let remaining = self.registry.broadcast(&room_id, Arc::new(notice));
        tracing::info!(%session_id, %user_id, %room_id, remaining, "Session left room");
        Ok(())
    }

    /// Drop a session after its socket closed.
    ///
    /// Persisted participants are left untouched. `userLeft` goes out only
    /// when `announce_disconnect` is enabled.
    pub async fn unregister_session(&self, session_id: &SessionId) {
        let Some(removed) = self.registry.remove_session(session_id) else {
            return;
        };

        if !self.config.announce_disconnect {
            return;
        }
        for room_id in removed.rooms {
            let _room_guard = self.registry.lock_room(room_id).await;
            self.registry.broadcast(
                &room_id,
                Arc::new(ServerMessage::user_left(removed.user_id.clone(), room_id)),
            );
        }
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, ChatError> {
        Ok(self.database.list_rooms().await?)
    }

    /// Full history of a room, oldest first.
    pub async fn room_history(&self, room_id: RoomId) -> Result<Vec<MessageView>, ChatError> {
        if self.database.find_room(&room_id).await?.is_none() {
            return Err(ChatError::RoomNotFound(room_id));
        }
        let messages = self.database.room_history(&room_id).await?;
        Ok(self.expand_authors(messages).await)
    }

    async fn recent_history(&self, room_id: &RoomId) -> Result<Vec<MessageView>, ChatError> {
        let messages = self
            .database
            .recent_messages(room_id, self.config.history_limit)
            .await?;
        Ok(self.expand_authors(messages).await)
    }

    async fn expand_authors(&self, messages: Vec<ChatMessage>) -> Vec<MessageView> {
        let mut authors: HashMap<UserId, AuthorInfo> = HashMap::new();
        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            let author = match authors.get(&message.user_id) {
                Some(author) => author.clone(),
                None => {
                    let author = self.resolve_author(&message.user_id).await;
                    authors.insert(message.user_id.clone(), author.clone());
                    author
                }
            };
            views.push(MessageView::new(message, author));
        }
        views
    }
}
