//! Storage backend configuration and startup seed data.

use super::defaults::{default_storage_backend, default_storage_max_connections};
use crate::protocol::RoomId;
use serde::{Deserialize, Serialize};

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[serde(alias = "memory")]
    InMemory,
    Sqlite,
}

/// Room created at startup when it does not already exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRoom {
    /// Fixed id so clients can rely on it across restarts
    #[serde(default)]
    pub id: Option<RoomId>,
    pub name: String,
}

/// Author display fields registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Storage configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    /// Connection string for the sqlite backend, e.g. `sqlite://parley.db`
    #[serde(default)]
    pub sqlite_url: Option<String>,
    #[serde(default = "default_storage_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub rooms: Vec<SeedRoom>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            sqlite_url: None,
            max_connections: default_storage_max_connections(),
            rooms: Vec::new(),
            users: Vec::new(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend == StorageBackend::Sqlite
            && self
                .sqlite_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .is_none()
        {
            anyhow::bail!("storage.sqlite_url must be set when storage.backend is \"sqlite\"");
        }
        for room in &self.rooms {
            if room.name.trim().is_empty() {
                anyhow::bail!("storage.rooms entries must have a non-empty name");
            }
        }
        for user in &self.users {
            if user.id.trim().is_empty() {
                anyhow::bail!("storage.users entries must have a non-empty id");
            }
        }
        Ok(())
    }
}
