/// Token Issuance and Verification
///
/// Creates and cryptographically verifies the three token classes. Access,
/// refresh, and password-reset tokens share one signing key; the `type`
/// claim is checked on every verification call so classes are never
/// interchangeable.

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenType};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

const JTI_LENGTH: usize = 32;

/// Generate a fresh random token ID for a refresh token.
///
/// The nonce makes two refresh tokens issued to the same player
/// distinguishable without decoding the secret; it carries no other meaning.
pub fn generate_jti() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JTI_LENGTH)
        .map(char::from)
        .collect()
}

/// Issue a short-lived access token for a player
///
/// # Errors
/// Returns error if token signing fails
pub fn issue_access_token(player_id: &Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(
        *player_id,
        TokenType::Access,
        config.access_token_expiry,
        config.issuer.clone(),
        None,
    );

    sign(&claims, config)
}

/// Issue a long-lived refresh token for a player
///
/// Returns the signed token together with its `jti` nonce.
///
/// # Errors
/// Returns error if token signing fails
pub fn issue_refresh_token(
    player_id: &Uuid,
    config: &JwtSettings,
) -> Result<(String, String), AppError> {
    let jti = generate_jti();
    let claims = Claims::new(
        *player_id,
        TokenType::Refresh,
        config.refresh_token_expiry,
        config.issuer.clone(),
        Some(jti.clone()),
    );

    Ok((sign(&claims, config)?, jti))
}

/// Issue a single-purpose password-reset token for a player
///
/// # Errors
/// Returns error if token signing fails
pub fn issue_reset_token(player_id: &Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(
        *player_id,
        TokenType::PasswordReset,
        config.reset_token_expiry,
        config.issuer.clone(),
        None,
    );

    sign(&claims, config)
}

fn sign(claims: &Claims, config: &JwtSettings) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
}

/// Validate a token and extract its claims
///
/// Checks signature, issuer, and expiry, then the `type` claim against
/// `expected_type`.
///
/// # Errors
/// - `ExpiredToken` for a well-formed, correctly signed token past expiry
/// - `InvalidToken` for everything else: bad signature, malformed input,
///   wrong issuer, or a token of the wrong class
pub fn verify_token(
    token: &str,
    expected_type: TokenType,
    config: &JwtSettings,
) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Token validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Auth(AuthError::ExpiredToken),
            _ => AppError::Auth(AuthError::InvalidToken),
        }
    })?;

    if claims.token_type != expected_type {
        tracing::warn!(
            expected = %expected_type,
            actual = %claims.token_type,
            "Token presented with wrong type"
        );
        return Err(AppError::Auth(AuthError::InvalidToken));
    }

    Ok(claims)
}
