use crate::auth::{bearer_token, AuthError, Identity};
use crate::protocol::{MessageView, Room, RoomId};
use crate::server::{ChatError, ChatServer};
use axum::extract::{FromRef, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Failure of a REST call, rendered as `{"errors": ...}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    Chat(ChatError),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self::Chat(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            Self::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            Self::Chat(ChatError::Persistence(err)) => {
                tracing::error!(error = %err, "Storage failure on REST request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error".to_string(),
                )
            }
            Self::Chat(err @ ChatError::RoomNotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            Self::Chat(err) => (StatusCode::BAD_REQUEST, err.user_message()),
        };
        (status, Json(json!({ "errors": reason }))).into_response()
    }
}

/// Identity of a REST caller, taken from `Authorization: Bearer`.
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<ChatServer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let server = Arc::<ChatServer>::from_ref(state);
        let token = bearer_token(&parts.headers);
        server
            .authenticator()
            .authenticate(token.as_deref())
            .await
            .map(Authenticated)
            .map_err(ApiError::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub room_id: RoomId,
    pub text: String,
}

pub async fn list_rooms(
    State(server): State<Arc<ChatServer>>,
    _caller: Authenticated,
) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(server.list_rooms().await?))
}

pub async fn room_messages(
    State(server): State<Arc<ChatServer>>,
    _caller: Authenticated,
    Path(room_id): Path<RoomId>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    Ok(Json(server.room_history(room_id).await?))
}

/// Fallback send for clients without a live socket.
pub async fn post_message(
    State(server): State<Arc<ChatServer>>,
    Authenticated(identity): Authenticated,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<MessageView>, ApiError> {
    let view = server
        .post_message(&identity.user_id, request.room_id, &request.text)
        .await?;
    Ok(Json(view))
}
