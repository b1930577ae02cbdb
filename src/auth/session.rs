/// Session Store
///
/// A session row backs one active refresh-token grant and is the sole
/// source of truth for whether that token is still live: a correctly
/// signed refresh token whose row is gone must be rejected.
///
/// The raw refresh token is never stored; every operation here is keyed by
/// its SHA-256 hash. Expiry is enforced by filtering on read rather than by
/// a background sweep.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// One active refresh-token grant
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub player_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Optional client metadata captured at session creation
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Hash a raw refresh token with SHA-256
///
/// Lookup key and stored form; the plaintext token only ever lives client-side.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create a session row for a freshly issued refresh token
///
/// # Errors
/// Returns error if the database operation fails
pub async fn create_session(
    pool: &PgPool,
    player_id: Uuid,
    raw_token: &str,
    expiry_seconds: i64,
    client: ClientInfo,
) -> Result<Uuid, AppError> {
    let session_id = Uuid::new_v4();
    let token_hash = hash_token(raw_token);
    let expires_at = Utc::now() + Duration::seconds(expiry_seconds);

    sqlx::query(
        r#"
        INSERT INTO sessions (id, player_id, token_hash, expires_at, user_agent, ip_address, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(session_id)
    .bind(player_id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(client.user_agent)
    .bind(client.ip_address)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(session_id)
}

/// Look up the session backing a refresh-token hash
///
/// Expired rows are filtered out here, never returned.
///
/// # Errors
/// Returns error if the database operation fails
pub async fn find_session_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<Session>, AppError> {
    let row = sqlx::query_as::<
        _,
        (
            Uuid,
            Uuid,
            DateTime<Utc>,
            Option<String>,
            Option<String>,
            DateTime<Utc>,
        ),
    >(
        r#"
        SELECT id, player_id, expires_at, user_agent, ip_address, created_at
        FROM sessions
        WHERE token_hash = $1 AND expires_at > NOW()
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, player_id, expires_at, user_agent, ip_address, created_at)| Session {
            id,
            player_id,
            expires_at,
            user_agent,
            ip_address,
            created_at,
        },
    ))
}

/// Rotate a session to a new refresh token in place
///
/// A single conditional update keyed by the row's identity AND its current
/// hash. Under two concurrent refreshes of the same token the first writer
/// wins; the second sees zero rows updated and gets `SessionNotFound`,
/// forcing re-authentication. The row keeps its id so the grant remains
/// auditable across rotations.
///
/// # Errors
/// - `SessionNotFound` if the row is gone or already rotated
/// - database errors otherwise
pub async fn rotate_session(
    pool: &PgPool,
    session_id: Uuid,
    current_hash: &str,
    new_raw_token: &str,
    expiry_seconds: i64,
) -> Result<(), AppError> {
    let new_hash = hash_token(new_raw_token);
    let new_expires_at = Utc::now() + Duration::seconds(expiry_seconds);

    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET token_hash = $1, expires_at = $2
        WHERE id = $3 AND token_hash = $4
        "#,
    )
    .bind(new_hash)
    .bind(new_expires_at)
    .bind(session_id)
    .bind(current_hash)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(session_id = %session_id, "Rotation lost: session gone or already rotated");
        return Err(AppError::Auth(AuthError::SessionNotFound));
    }

    Ok(())
}

/// Delete the session backing a refresh-token hash (logout)
///
/// # Errors
/// Returns error if the database operation fails
pub async fn delete_session_by_hash(pool: &PgPool, token_hash: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete one session by id, scoped to its owner
///
/// The same `SessionNotFound` covers a missing id and someone else's id,
/// so the endpoint is not an existence oracle across players.
///
/// # Errors
/// - `SessionNotFound` if no owned row matches
/// - database errors otherwise
pub async fn delete_session(
    pool: &PgPool,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND player_id = $2")
        .bind(session_id)
        .bind(player_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Auth(AuthError::SessionNotFound));
    }

    Ok(())
}

/// Delete all of a player's sessions, optionally sparing one
///
/// Returns the number of sessions revoked.
///
/// # Errors
/// Returns error if the database operation fails
pub async fn delete_all_sessions(
    pool: &PgPool,
    player_id: Uuid,
    except: Option<Uuid>,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE player_id = $1 AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(player_id)
    .bind(except)
    .execute(pool)
    .await?;

    tracing::info!(
        player_id = %player_id,
        revoked = result.rows_affected(),
        "Bulk session revocation"
    );
    Ok(result.rows_affected())
}

/// List a player's active sessions, newest first
///
/// # Errors
/// Returns error if the database operation fails
pub async fn list_active_sessions(
    pool: &PgPool,
    player_id: Uuid,
) -> Result<Vec<Session>, AppError> {
    let rows = sqlx::query_as::<
        _,
        (
            Uuid,
            Uuid,
            DateTime<Utc>,
            Option<String>,
            Option<String>,
            DateTime<Utc>,
        ),
    >(
        r#"
        SELECT id, player_id, expires_at, user_agent, ip_address, created_at
        FROM sessions
        WHERE player_id = $1 AND expires_at > NOW()
        ORDER BY created_at DESC
        "#,
    )
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, player_id, expires_at, user_agent, ip_address, created_at)| Session {
                id,
                player_id,
                expires_at,
                user_agent,
                ip_address,
                created_at,
            },
        )
        .collect())
}
