/// Auth Gateway
///
/// Request-time entry point for authentication. Extracts the bearer token,
/// checks the revocation list, verifies the token as an access token, and
/// resolves to either a player identity or an explicit unauthenticated
/// context. A missing or bad token is a resolved state, never an error
/// thrown into handlers; only infrastructure failures (unreachable
/// revocation cache) propagate.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use crate::auth::{verify_token, TokenType};
use crate::blacklist::TokenBlacklist;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

/// Resolved authentication state for one request
///
/// Handlers must check `is_authenticated` (via `require_player_id`) before
/// trusting `player_id`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub player_id: Option<Uuid>,
    pub is_authenticated: bool,
    /// The verified bearer token, kept so logout can revoke it
    access_token: Option<String>,
    /// Its embedded expiry (Unix timestamp)
    expires_at: Option<i64>,
}

impl AuthContext {
    fn unauthenticated() -> Self {
        Self {
            player_id: None,
            is_authenticated: false,
            access_token: None,
            expires_at: None,
        }
    }

    fn authenticated(player_id: Uuid, token: String, expires_at: i64) -> Self {
        Self {
            player_id: Some(player_id),
            is_authenticated: true,
            access_token: Some(token),
            expires_at: Some(expires_at),
        }
    }

    /// The caller's identity, or `MissingToken` when unauthenticated
    pub fn require_player_id(&self) -> Result<Uuid, AppError> {
        self.player_id
            .filter(|_| self.is_authenticated)
            .ok_or(AppError::Auth(AuthError::MissingToken))
    }

    /// The verified bearer token with the seconds left until its expiry,
    /// for handing to the revocation list
    pub fn bearer_for_revocation(&self) -> Option<(&str, i64)> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(exp)) => {
                let remaining = (exp - chrono::Utc::now().timestamp()).max(0);
                Some((token.as_str(), remaining))
            }
            _ => None,
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl FromRequest for AuthContext {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let jwt_config = req.app_data::<web::Data<JwtSettings>>().cloned();
        let blacklist = req.app_data::<web::Data<TokenBlacklist>>().cloned();

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => return Ok(AuthContext::unauthenticated()),
            };

            let jwt_config = jwt_config.ok_or_else(|| {
                AppError::Config(ConfigError::MissingRequired("jwt settings".to_string()))
            })?;
            let blacklist = blacklist.ok_or_else(|| {
                AppError::Config(ConfigError::MissingRequired(
                    "revocation cache handle".to_string(),
                ))
            })?;

            // Revoked tokens die here even though their signature still checks out
            if blacklist.is_blacklisted(&token).await? {
                tracing::warn!("Rejected blacklisted access token");
                return Ok(AuthContext::unauthenticated());
            }

            match verify_token(&token, TokenType::Access, &jwt_config) {
                Ok(claims) => match claims.player_id() {
                    Ok(player_id) => {
                        tracing::debug!(player_id = %player_id, "Access token verified");
                        Ok(AuthContext::authenticated(player_id, token, claims.exp))
                    }
                    Err(_) => Ok(AuthContext::unauthenticated()),
                },
                // Invalid and expired tokens both resolve, not fail
                Err(AppError::Auth(_)) => Ok(AuthContext::unauthenticated()),
                Err(e) => Err(e),
            }
        })
    }
}
