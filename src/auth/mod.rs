//! Session authentication.
//!
//! The [`Authenticator`] gates every WebSocket handshake and every REST call:
//! a credential either resolves to an [`Identity`] or the request is refused
//! with an [`AuthError`] whose `Display` is the reason sent back to the client.

pub mod error;
pub mod handshake;
pub mod token;

pub use error::AuthError;
pub use handshake::{bearer_token, extract_credential, HandshakeQuery};
pub use token::{CredentialVerifier, Identity, JwtVerifier};

use std::sync::Arc;

/// Accept/reject decision for presented credentials. Has no side effects.
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn CredentialVerifier>,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Authenticator backed by a shared-secret JWT verifier.
    pub fn jwt(secret: &str, leeway_secs: u64) -> Self {
        Self::new(Arc::new(JwtVerifier::new(secret, leeway_secs)))
    }

    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, AuthError> {
        let Some(token) = credential else {
            tracing::warn!("Credential missing at handshake");
            return Err(AuthError::MissingCredential);
        };

        match self.verifier.verify(token).await {
            Ok(identity) => Ok(identity),
            Err(err) => {
                tracing::warn!(reason = %err, "Credential rejected");
                Err(err)
            }
        }
    }
}
