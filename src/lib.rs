#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # Parley Server
//!
//! Real-time chat over WebSocket: JWT-authenticated sessions join rooms,
//! receive recent history, and exchange messages that are persisted before
//! they are broadcast, in append order, to every live member.

/// Handshake and bearer-token authentication
pub mod auth;

/// Server configuration and environment variables
pub mod config;

/// Room, message, and user persistence (in-memory and SQLite)
pub mod database;

/// Structured logging configuration
pub mod logging;

/// Wire events and stored record types
pub mod protocol;

/// Chat orchestration and the live connection registry
pub mod server;

/// WebSocket and REST endpoints
pub mod websocket;
