//! Default value functions for configuration fields.
//!
//! Used by serde's `#[serde(default = ...)]` attributes throughout the
//! configuration system.

use super::logging::{LogFormat, LogRotation};
use super::storage::StorageBackend;
use crate::protocol::{DEFAULT_HISTORY_LIMIT, DEFAULT_SUMMARY_MAX_CHARS};

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    5000
}

// =============================================================================
// Server Defaults
// =============================================================================

pub const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

pub const fn default_summary_max_chars() -> usize {
    DEFAULT_SUMMARY_MAX_CHARS
}

pub const fn default_max_text_length() -> usize {
    2000
}

pub const fn default_announce_disconnect() -> bool {
    false
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_jwt_leeway_secs() -> u64 {
    0
}

// =============================================================================
// Storage Defaults
// =============================================================================

pub const fn default_storage_backend() -> StorageBackend {
    StorageBackend::InMemory
}

pub const fn default_storage_max_connections() -> u32 {
    5
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_outbound_queue_capacity() -> usize {
    64
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "parley.log".to_string()
}

pub const fn default_rotation() -> LogRotation {
    LogRotation::Daily
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
