//! Bearer credential verification.
//!
//! Tokens are HS256 JWTs issued by the account service. The user identifier is
//! normalized exactly once here: `userId` wins, then `id`, then `sub`. Nothing
//! downstream looks at raw claims.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use super::error::AuthError;
use crate::protocol::UserId;

/// Authenticated principal attached to a session for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

/// Verifies a credential string and yields the identity it was issued to.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default, rename = "userId")]
    user_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
}

impl RawClaims {
    fn into_identity(self) -> Result<Identity, AuthError> {
        [self.user_id, self.id, self.sub]
            .into_iter()
            .flatten()
            .find_map(claim_to_user_id)
            .map(|user_id| Identity { user_id })
            .ok_or(AuthError::MissingIdentity)
    }
}

fn claim_to_user_id(value: Value) -> Option<UserId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Shared-secret JWT verifier.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn decode_identity(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<RawClaims>(token, &self.decoding_key, &self.validation)?;
        data.claims.into_identity()
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.decode_identity(token)
    }
}
