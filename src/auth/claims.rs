/// JWT Claims structure
///
/// Represents the payload of a signed token: subject, a type discriminant,
/// and standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Token class discriminant.
///
/// All classes are signed with the same key; `verify_token` checks this
/// field on every validation so a structurally valid token of one class can
/// never be presented as another.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    PasswordReset,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
            TokenType::PasswordReset => write!(f, "password_reset"),
        }
    }
}

/// Claims carried by every issued token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (player ID as UUID string)
    pub sub: String,
    /// Token class
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token ID (random nonce, refresh tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    pub fn new(
        player_id: Uuid,
        token_type: TokenType,
        expiry_seconds: i64,
        issuer: String,
        jti: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: player_id.to_string(),
            token_type,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti,
        }
    }

    /// Extract the player ID from the claims
    ///
    /// # Errors
    /// Returns `InvalidToken` if the subject is not a valid UUID
    pub fn player_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::InvalidToken))
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }

    /// Seconds until the embedded expiry, clamped at zero
    pub fn remaining_seconds(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();
        (self.exp - now).max(0)
    }
}
