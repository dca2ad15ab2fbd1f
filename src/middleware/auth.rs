//! Bearer token authentication for `/embed`

use axum::http::{header::AUTHORIZATION, HeaderMap};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::AuthConfig;

/// Token prefix expected in the `Authorization` header
pub const TOKEN_PREFIX: &str = "Bearer";

/// Checks the `Authorization` header against the configured token.
///
/// Only a SHA-256 digest of the expected header value is kept, and the
/// comparison is made between digests so it does not short-circuit on the
/// first differing byte of the secret.
#[derive(Clone)]
pub struct BearerAuth {
    expected_digest: Option<[u8; 32]>,
}

impl BearerAuth {
    /// Create a checker from configuration. No token means open mode.
    pub fn new(config: &AuthConfig) -> Self {
        let expected_digest = config
            .api_token
            .as_ref()
            .map(|t| t.expose_secret())
            .filter(|t| !t.is_empty())
            .map(|t| digest(&format!("{} {}", TOKEN_PREFIX, t)));

        Self { expected_digest }
    }

    /// Whether a token is required at all
    pub fn is_enforced(&self) -> bool {
        self.expected_digest.is_some()
    }

    /// Authenticate a raw `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> Result<(), AuthError> {
        let Some(expected) = &self.expected_digest else {
            return Ok(());
        };

        let header = header.ok_or_else(|| {
            warn!("Authentication failed: missing Authorization header");
            AuthError::MissingToken
        })?;

        if digests_match(expected, &digest(header)) {
            debug!("Authentication successful");
            Ok(())
        } else {
            warn!("Authentication failed: invalid token");
            Err(AuthError::InvalidToken)
        }
    }

    /// Authenticate a request by its headers
    pub fn authorize_headers(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        if !self.is_enforced() {
            return Ok(());
        }

        match headers.get(AUTHORIZATION) {
            None => self.authorize(None),
            Some(value) => match value.to_str() {
                Ok(value) => self.authorize(Some(value)),
                Err(_) => {
                    warn!("Authentication failed: non-ASCII Authorization header");
                    Err(AuthError::InvalidToken)
                }
            },
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid API token")]
    InvalidToken,

    #[error("Missing Authorization header")]
    MissingToken,
}
