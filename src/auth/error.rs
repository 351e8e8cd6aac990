use thiserror::Error;

use crate::protocol::ErrorCode;

/// Reasons a handshake credential is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredential,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Invalid or malformed token")]
    Malformed,
    /// Token verified but carries no usable user identifier.
    #[error("Token does not identify a user")]
    MissingIdentity,
}

impl AuthError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingCredential => ErrorCode::AuthenticationRequired,
            Self::Expired => ErrorCode::TokenExpired,
            Self::InvalidSignature | Self::Malformed | Self::MissingIdentity => {
                ErrorCode::InvalidToken
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Malformed,
        }
    }
}
