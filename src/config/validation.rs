//! Configuration validation functions.

use super::security::MIN_RECOMMENDED_SECRET_LEN;
use super::Config;

/// Reject configurations the server cannot run with, and warn about weak ones.
///
/// Runs before logging is initialized, so warnings go to stderr.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let Some(secret) = config.security.secret() else {
        anyhow::bail!(
            "\nCRITICAL: No JWT secret configured!\n\
             ===================================================================\n\
             Every WebSocket handshake and REST call is verified against it.\n\
             export PARLEY__SECURITY__JWT_SECRET=\"$(openssl rand -hex 32)\"\n\
             ===================================================================\n"
        );
    };

    if secret.len() < MIN_RECOMMENDED_SECRET_LEN {
        eprintln!(
            "\nWARNING: JWT secret is very short ({} bytes).\n\
             Recommended: At least {MIN_RECOMMENDED_SECRET_LEN} bytes.\n\
             Generate a strong secret: openssl rand -hex 32\n",
            secret.len()
        );
    }

    config.server.validate()?;
    config.storage.validate()?;
    config.websocket.validate()?;

    Ok(())
}
