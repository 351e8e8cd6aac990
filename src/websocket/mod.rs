// WebSocket module - the network surface of the chat server
//
// - handler: WebSocket upgrade handler, authenticates the handshake
// - connection: per-connection send/receive loops
// - sending: event serialization onto the socket
// - api: bearer-authenticated REST endpoints
// - routes: HTTP route setup and the serve loop

mod api;
mod connection;
mod handler;
mod routes;
mod sending;

pub use api::{ApiError, Authenticated, PostMessageRequest};
pub use handler::websocket_handler;
pub use routes::{create_router, run_server};
