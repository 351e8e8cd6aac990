//! Credential and cross-origin configuration types.

use super::defaults::{default_cors_origins, default_jwt_leeway_secs};
use serde::{Deserialize, Serialize};

/// Secrets shorter than this are accepted with a warning.
pub const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// HS256 secret shared with the service that issues user tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Clock skew tolerated when checking token expiry (seconds)
    #[serde(default = "default_jwt_leeway_secs")]
    pub jwt_leeway_secs: u64,
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_leeway_secs: default_jwt_leeway_secs(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl SecurityConfig {
    /// The configured secret, if it is present and non-blank.
    pub fn secret(&self) -> Option<&str> {
        self.jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parsed CORS origin list; `None` means any origin.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let trimmed = self.cors_origins.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return None;
        }
        Some(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}
