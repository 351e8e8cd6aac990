//! Configuration module for Parley.
//!
//! Configuration is layered JSON: compiled-in defaults, then `config.json`
//! files, stdin, and an inline env document, then per-field env overrides.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Chat behavior (history window, summaries, text limits)
//! - [`security`]: Token secret and CORS
//! - [`storage`]: Backend selection and startup seed data
//! - [`websocket`]: Frame size and outbound queue settings
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod security;
pub mod server;
pub mod storage;
pub mod types;
pub mod validation;
pub mod websocket;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LogRotation, LoggingConfig};

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use storage::{SeedRoom, SeedUser, StorageBackend, StorageConfig};

pub use types::{Config, REDACTED};

pub use validation::validate_config;

pub use websocket::WebSocketConfig;
