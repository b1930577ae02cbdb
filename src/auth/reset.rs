/// Password Reset Ledger
///
/// Durable single-use records linking reset tokens to players. A record
/// moves from issued to used exactly once, atomically with the password
/// change; rows are kept after use for audit, with `expires_at` and the
/// `used` flag jointly gating validity.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::claims::TokenType;
use crate::auth::jwt::{issue_reset_token, verify_token};
use crate::auth::password::hash_password;
use crate::configuration::JwtSettings;
use crate::email_client::EmailClient;
use crate::error::{AppError, AuthError};

/// Issue a reset token for the account behind `email`, if any
///
/// Always reports success to the caller: an unknown email is logged and
/// swallowed so the endpoint cannot be used to probe which addresses are
/// registered. Notifier failures are logged and swallowed too; the ledger
/// row already exists and the player can re-request.
///
/// # Errors
/// Returns error only on database or signing failure
pub async fn request_password_reset(
    pool: &PgPool,
    email_client: &EmailClient,
    config: &JwtSettings,
    email: &str,
) -> Result<(), AppError> {
    let player = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM players WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    let player_id = match player {
        Some((id,)) => id,
        None => {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        }
    };

    let token = issue_reset_token(&player_id, config)?;
    let expires_at = Utc::now() + Duration::seconds(config.reset_token_expiry);

    sqlx::query(
        r#"
        INSERT INTO password_resets (id, player_id, token, expires_at, used, created_at)
        VALUES ($1, $2, $3, $4, false, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(player_id)
    .bind(&token)
    .bind(expires_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    // Fire-and-forget: a failed send never rolls back the issued token
    if let Err(e) = email_client.send_password_reset(email, &token).await {
        tracing::error!(
            player_id = %player_id,
            error = %e,
            "Failed to send password reset email"
        );
    }

    tracing::info!(player_id = %player_id, "Password reset token issued");
    Ok(())
}

/// Check a reset token and return the owning email if it is still usable
///
/// Fails closed: bad signature, wrong type, expired, missing ledger row,
/// and already-used row all come back as `None`.
///
/// # Errors
/// Returns error only on database failure
pub async fn verify_reset_token(
    pool: &PgPool,
    config: &JwtSettings,
    token: &str,
) -> Result<Option<String>, AppError> {
    if verify_token(token, TokenType::PasswordReset, config).is_err() {
        return Ok(None);
    }

    let row = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT p.email
        FROM password_resets pr
        JOIN players p ON p.id = pr.player_id
        WHERE pr.token = $1 AND pr.expires_at > NOW() AND pr.used = false
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(email,)| email))
}

/// Consume a reset token and set the player's new password
///
/// One transaction spans both writes: the conditional flip of the `used`
/// flag and the password update commit together or not at all. The flip is
/// keyed on `used = false`, so of two concurrent consumers exactly one
/// updates a row; the other aborts with `InvalidResetToken`.
///
/// # Errors
/// - `InvalidResetToken` for any token validity failure (expired, used,
///   forged, unknown - deliberately not distinguished)
/// - validation errors for a too-weak replacement password
/// - database errors otherwise
pub async fn consume_reset_token(
    pool: &PgPool,
    config: &JwtSettings,
    token: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if verify_token(token, TokenType::PasswordReset, config).is_err() {
        return Err(AppError::Auth(AuthError::InvalidResetToken));
    }

    let password_hash = hash_password(new_password)?;

    let mut tx = pool.begin().await?;

    let consumed = sqlx::query_as::<_, (Uuid,)>(
        r#"
        UPDATE password_resets
        SET used = true
        WHERE token = $1 AND expires_at > NOW() AND used = false
        RETURNING player_id
        "#,
    )
    .bind(token)
    .fetch_optional(&mut tx)
    .await?;

    let player_id = match consumed {
        Some((id,)) => id,
        None => {
            tx.rollback().await?;
            return Err(AppError::Auth(AuthError::InvalidResetToken));
        }
    };

    sqlx::query("UPDATE players SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(player_id)
        .execute(&mut tx)
        .await?;

    tx.commit().await?;

    tracing::info!(player_id = %player_id, "Password reset completed");
    Ok(())
}
