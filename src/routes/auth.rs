/// Authentication Routes
///
/// Registration, login, token refresh, logout, and current player lookup.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    create_session, delete_session_by_hash, find_session_by_hash, hash_password, hash_token,
    issue_access_token, issue_refresh_token, rotate_session, verify_password, verify_token,
    ClientInfo, TokenType,
};
use crate::blacklist::TokenBlacklist;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::AuthContext;
use crate::validators::{is_valid_email, is_valid_username};

/// Player registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

/// Player login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request; the access token travels in the Authorization header
#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Player information response
#[derive(Serialize)]
pub struct PlayerResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: String,
}

fn client_info(req: &HttpRequest) -> ClientInfo {
    ClientInfo {
        user_agent: req
            .headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        ip_address: req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string),
    }
}

/// POST /auth/register
///
/// Register a new player with email, password, and username.
/// Returns an access/refresh token pair and opens a session.
///
/// # Errors
/// - 400: Validation errors (invalid email/password/username)
/// - 409: Email or username already in use (deliberately not saying which)
/// - 500: Internal server error
pub async fn register(
    req: HttpRequest,
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("player_registration");

    let email = is_valid_email(&form.email)?;
    let username = is_valid_username(&form.username)?;
    let password_hash = hash_password(&form.password)?;

    let player_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO players (id, email, username, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(player_id)
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await?;

    let access_token = issue_access_token(&player_id, jwt_config.get_ref())?;
    let (refresh_token, _jti) = issue_refresh_token(&player_id, jwt_config.get_ref())?;

    create_session(
        pool.get_ref(),
        player_id,
        &refresh_token,
        jwt_config.refresh_token_expiry,
        client_info(&req),
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        player_id = %player_id,
        "Player registered successfully"
    );

    Ok(HttpResponse::Created().json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/login
///
/// Authenticate a player with email and password.
///
/// # Errors
/// - 400: Validation error (invalid email format)
/// - 401: Invalid credentials (email not found or wrong password)
/// - 500: Internal server error
///
/// # Security Notes
/// - Unknown email and wrong password yield the same error, preventing
///   account enumeration
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("player_login");

    let email = is_valid_email(&form.email)?;

    let player = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, password_hash FROM players WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let (player_id, password_hash) = player;

    let password_valid = verify_password(&form.password, &password_hash)?;
    if !password_valid {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let access_token = issue_access_token(&player_id, jwt_config.get_ref())?;
    let (refresh_token, _jti) = issue_refresh_token(&player_id, jwt_config.get_ref())?;

    create_session(
        pool.get_ref(),
        player_id,
        &refresh_token,
        jwt_config.refresh_token_expiry,
        client_info(&req),
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        player_id = %player_id,
        "Player logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new access/refresh pair.
///
/// The session row is rotated in place with a conditional update: under two
/// concurrent refreshes of the same token exactly one caller wins; the
/// loser gets 404 and must log in again. The superseded token can never be
/// used again.
///
/// # Errors
/// - 401: Malformed, wrong-type, or expired refresh token
/// - 404: No live session backs the token (revoked, expired, or already rotated)
/// - 500: Internal server error
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    // Signature validity alone is not enough: the session row decides liveness
    verify_token(&form.refresh_token, TokenType::Refresh, jwt_config.get_ref())?;

    let presented_hash = hash_token(&form.refresh_token);
    let session = find_session_by_hash(pool.get_ref(), &presented_hash)
        .await?
        .ok_or(AppError::Auth(AuthError::SessionNotFound))?;

    let access_token = issue_access_token(&session.player_id, jwt_config.get_ref())?;
    let (refresh_token, _jti) = issue_refresh_token(&session.player_id, jwt_config.get_ref())?;

    rotate_session(
        pool.get_ref(),
        session.id,
        &presented_hash,
        &refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        player_id = %session.player_id,
        session_id = %session.id,
        "Token refreshed successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// End the current session. Requires a valid access token as proof of
/// possession; the refresh token travels in the body.
///
/// Two invalidations happen: the access token goes on the revocation list
/// for the rest of its natural lifetime, and the session row backing the
/// refresh token is deleted.
///
/// # Errors
/// - 401: Missing or invalid access token
/// - 503: Revocation cache unreachable
pub async fn logout(
    ctx: AuthContext,
    form: web::Json<LogoutRequest>,
    pool: web::Data<PgPool>,
    blacklist: web::Data<TokenBlacklist>,
) -> Result<HttpResponse, AppError> {
    let player_id = ctx.require_player_id()?;

    if let Some((token, remaining)) = ctx.bearer_for_revocation() {
        blacklist.blacklist(token, remaining).await?;
    }

    delete_session_by_hash(pool.get_ref(), &hash_token(&form.refresh_token)).await?;

    tracing::info!(player_id = %player_id, "Player logged out");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out"
    })))
}

/// GET /auth/me
///
/// Current authenticated player's profile.
///
/// # Errors
/// - 401: Missing, invalid, or revoked access token
/// - 500: Internal server error
pub async fn get_current_player(
    ctx: AuthContext,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let player_id = ctx.require_player_id()?;

    let player = sqlx::query_as::<_, (Uuid, String, String, chrono::DateTime<Utc>)>(
        "SELECT id, email, username, created_at FROM players WHERE id = $1",
    )
    .bind(player_id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(PlayerResponse {
        id: player.0.to_string(),
        email: player.1,
        username: player.2,
        created_at: player.3.to_rfc3339(),
    }))
}
