use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{RoomId, ServerMessage, SessionId, UserId};

/// Outbound half of a session's event queue.
pub type OutboundSender = mpsc::Sender<Arc<ServerMessage>>;

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: UserId,
    rooms: HashSet<RoomId>,
    sender: OutboundSender,
}

/// What was left of a session when it was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSession {
    pub user_id: UserId,
    pub rooms: Vec<RoomId>,
}

/// Live sessions and their room memberships.
///
/// Each session entry and each room's member map live under a single map
/// entry, so every mutation is atomic with respect to others on the same
/// session or room, and a broadcast iterates a consistent member set.
/// Lock order is always sessions before rooms.
pub struct ConnectionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
    rooms: DashMap<RoomId, HashMap<SessionId, OutboundSender>>,
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            rooms: DashMap::new(),
            room_locks: DashMap::new(),
        }
    }

    /// Record an authenticated session.
    pub fn register(&self, user_id: UserId, sender: OutboundSender) -> SessionId {
        let session_id = Uuid::new_v4();
        info!(%session_id, %user_id, "Session registered");
        self.sessions.insert(
            session_id,
            SessionEntry {
                user_id,
                rooms: HashSet::new(),
                sender,
            },
        );
        session_id
    }

    /// Add a session to a room. Returns `false` if it was already a member
    /// or the session is unknown.
    pub fn join_room(&self, session_id: &SessionId, room_id: RoomId) -> bool {
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            warn!(%session_id, %room_id, "Join for unknown session ignored");
            return false;
        };
        if !session.rooms.insert(room_id) {
            return false;
        }
        self.rooms
            .entry(room_id)
            .or_default()
            .insert(*session_id, session.sender.clone());
        true
    }

    /// Remove a session from a room. Returns `false` if it was not a member.
    pub fn leave_room(&self, session_id: &SessionId, room_id: &RoomId) -> bool {
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        if !session.rooms.remove(room_id) {
            return false;
        }
        self.detach_from_room(session_id, room_id);
        true
    }

    /// Remove a session and every membership it held.
    pub fn remove_session(&self, session_id: &SessionId) -> Option<RemovedSession> {
        let (_, session) = self.sessions.remove(session_id)?;
        for room_id in &session.rooms {
            self.detach_from_room(session_id, room_id);
        }
        info!(
            %session_id,
            user_id = %session.user_id,
            rooms = session.rooms.len(),
            "Session removed"
        );
        Some(RemovedSession {
            user_id: session.user_id,
            rooms: session.rooms.into_iter().collect(),
        })
    }

    fn detach_from_room(&self, session_id: &SessionId, room_id: &RoomId) {
        self.rooms.remove_if_mut(room_id, |_, members| {
            members.remove(session_id);
            members.is_empty()
        });
    }

    pub fn is_member(&self, session_id: &SessionId, room_id: &RoomId) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|session| session.rooms.contains(room_id))
    }

    pub fn user_id(&self, session_id: &SessionId) -> Option<UserId> {
        self.sessions
            .get(session_id)
            .map(|session| session.user_id.clone())
    }

    #[cfg(test)]
    pub(crate) fn joined_rooms(&self, session_id: &SessionId) -> Vec<RoomId> {
        self.sessions
            .get(session_id)
            .map(|session| session.rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of a room's live members.
    pub fn room_members(&self, room_id: &RoomId) -> Vec<SessionId> {
        self.rooms
            .get(room_id)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Deliver to every live member of a room. Returns how many queues
    /// accepted the event.
    pub fn broadcast(&self, room_id: &RoomId, message: Arc<ServerMessage>) -> usize {
        self.broadcast_filtered(room_id, None, message)
    }

    /// Deliver to every live member of a room except one session.
    pub fn broadcast_except(
        &self,
        room_id: &RoomId,
        except: &SessionId,
        message: Arc<ServerMessage>,
    ) -> usize {
        self.broadcast_filtered(room_id, Some(except), message)
    }

    fn broadcast_filtered(
        &self,
        room_id: &RoomId,
        except: Option<&SessionId>,
        message: Arc<ServerMessage>,
    ) -> usize {
        let Some(members) = self.rooms.get(room_id) else {
            return 0;
        };
        members
            .iter()
            .filter(|(session_id, _)| Some(*session_id) != except)
            .filter(|(session_id, sender)| deliver(session_id, sender, Arc::clone(&message)))
            .count()
    }

    /// Deliver directly to one session.
    pub fn send_to(&self, session_id: &SessionId, message: Arc<ServerMessage>) -> bool {
        let Some(sender) = self
            .sessions
            .get(session_id)
            .map(|session| session.sender.clone())
        else {
            debug!(%session_id, "Dropping event for departed session");
            return false;
        };
        deliver(session_id, &sender, message)
    }

    /// Serialize state-changing operations on one room until the guard drops.
    ///
    /// Lock entries exist only while someone holds or waits on them.
    pub async fn lock_room(&self, room_id: RoomId) -> RoomGuard<'_> {
        let mut guard = RoomGuard {
            held: None,
            registry: self,
            room_id,
        };
        let lock = Arc::clone(self.room_locks.entry(room_id).or_default().value());
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    #[cfg(test)]
    pub(crate) fn room_lock_count(&self) -> usize {
        self.room_locks.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Rooms with at least one live member.
    pub fn active_room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Exclusive access to one room, released on drop.
pub struct RoomGuard<'a> {
    held: Option<OwnedMutexGuard<()>>,
    registry: &'a ConnectionRegistry,
    room_id: RoomId,
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        // Entry and removal share the shard lock, so a count of one means
        // nobody else holds or waits on this mutex.
        self.registry
            .room_locks
            .remove_if(&self.room_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(session_id: &SessionId, sender: &OutboundSender, message: Arc<ServerMessage>) -> bool {
    match sender.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(%session_id, "Outbound queue full; event dropped");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%session_id, "Outbound queue closed; event dropped");
            false
        }
    }
}
