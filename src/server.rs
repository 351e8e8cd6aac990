use crate::auth::{Authenticator, Identity};
use crate::config::Config;
use crate::database::{create_database, seed, ChatDatabase, DatabaseConfig};
use crate::protocol::{SessionId, UserId, DEFAULT_HISTORY_LIMIT, DEFAULT_SUMMARY_MAX_CHARS};
use anyhow::Context;
use std::sync::Arc;

mod chat_service;
mod error;
mod message_router;
mod messaging;
pub mod registry;
mod room_service;
#[cfg(test)]
mod room_service_tests;
#[cfg(test)]
pub(crate) mod test_support;

pub use error::ChatError;
pub use registry::{ConnectionRegistry, OutboundSender, RemovedSession, RoomGuard};

/// Runtime settings for the chat server, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub history_limit: usize,
    pub summary_max_chars: usize,
    pub max_text_length: usize,
    pub announce_disconnect: bool,
    pub max_message_size: usize,
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
            max_text_length: 2000,
            announce_disconnect: false,
            max_message_size: 65536, // 64KB
            outbound_queue_capacity: 64,
        }
    }
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_limit: config.server.history_limit,
            summary_max_chars: config.server.summary_max_chars,
            max_text_length: config.server.max_text_length,
            announce_disconnect: config.server.announce_disconnect,
            max_message_size: config.websocket.max_message_size,
            outbound_queue_capacity: config.websocket.outbound_queue_capacity.max(1),
        }
    }
}

/// The chat protocol state machine plus everything it orchestrates: storage,
/// the live connection registry, and handshake authentication.
pub struct ChatServer {
    database: Arc<dyn ChatDatabase>,
    registry: Arc<ConnectionRegistry>,
    authenticator: Authenticator,
    config: ServerConfig,
}

impl ChatServer {
    pub fn new(
        config: ServerConfig,
        database: Arc<dyn ChatDatabase>,
        authenticator: Authenticator,
    ) -> Arc<Self> {
        Arc::new(Self {
            database,
            registry: Arc::new(ConnectionRegistry::new()),
            authenticator,
            config,
        })
    }

    /// Build a server from loaded configuration: open storage, apply seed
    /// data, and set up the token verifier.
    pub async fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        let secret = config
            .security
            .secret()
            .context("security.jwt_secret is required")?;
        let authenticator = Authenticator::jwt(secret, config.security.jwt_leeway_secs);

        let database = create_database(DatabaseConfig::from_storage_config(&config.storage)?)
            .await
            .context("failed to initialize storage")?;
        seed(database.as_ref(), &config.storage)
            .await
            .context("failed to apply storage seed data")?;

        Ok(Self::new(
            ServerConfig::from_config(config),
            database,
            authenticator,
        ))
    }

    /// Record an authenticated connection.
    pub fn register_session(&self, identity: &Identity, sender: OutboundSender) -> SessionId {
        self.registry.register(identity.user_id.clone(), sender)
    }

    pub(crate) fn session_user(&self, session_id: &SessionId) -> Option<UserId> {
        let user_id = self.registry.user_id(session_id);
        if user_id.is_none() {
            tracing::debug!(%session_id, "Event for departed session ignored");
        }
        user_id
    }

    pub async fn health_check(&self) -> bool {
        self.database.health_check().await
    }

    pub fn database(&self) -> &dyn ChatDatabase {
        self.database.as_ref()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
