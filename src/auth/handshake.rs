use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;

/// Query parameters accepted on the WebSocket upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Pull the credential out of an upgrade request.
///
/// The `token` query parameter wins over the `Authorization: Bearer` header,
/// since browsers cannot set headers on WebSocket requests.
pub fn extract_credential(headers: &HeaderMap, query: &HandshakeQuery) -> Option<String> {
    query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .or_else(|| bearer_token(headers))
}

/// Read a bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}
