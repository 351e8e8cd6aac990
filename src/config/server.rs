//! Chat behavior configuration types.

use super::defaults::{
    default_announce_disconnect, default_history_limit, default_max_text_length,
    default_summary_max_chars,
};
use serde::{Deserialize, Serialize};

/// Chat server behavior.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Number of recent messages replayed to a session when it joins a room
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Characters kept in a room's last-message summary before the ellipsis
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,
    /// Longest accepted message text, in characters, after trimming
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Broadcast `userLeft` to joined rooms when a socket disconnects.
    /// Persisted participants are never touched by a disconnect.
    #[serde(default = "default_announce_disconnect")]
    pub announce_disconnect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            summary_max_chars: default_summary_max_chars(),
            max_text_length: default_max_text_length(),
            announce_disconnect: default_announce_disconnect(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.history_limit == 0 {
            anyhow::bail!("server.history_limit must be greater than zero");
        }
        if self.summary_max_chars == 0 {
            anyhow::bail!("server.summary_max_chars must be greater than zero");
        }
        if self.max_text_length == 0 {
            anyhow::bail!("server.max_text_length must be greater than zero");
        }
        Ok(())
    }
}
