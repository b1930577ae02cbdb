/// Session Management Routes
///
/// Lets an authenticated player audit and revoke their own refresh-token
/// grants. Only opaque session ids and client metadata ever leave the
/// store.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{delete_all_sessions, delete_session, list_active_sessions};
use crate::error::AppError;
use crate::middleware::AuthContext;

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Deserialize)]
pub struct RevokeAllQuery {
    pub except: Option<Uuid>,
}

/// GET /auth/sessions
///
/// Active sessions for the current player, newest first.
///
/// # Errors
/// - 401: Not authenticated
pub async fn list_sessions(
    ctx: AuthContext,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let player_id = ctx.require_player_id()?;

    let sessions = list_active_sessions(pool.get_ref(), player_id).await?;

    let response: Vec<SessionResponse> = sessions
        .into_iter()
        .map(|s| SessionResponse {
            id: s.id.to_string(),
            user_agent: s.user_agent,
            ip_address: s.ip_address,
            created_at: s.created_at.to_rfc3339(),
            expires_at: s.expires_at.to_rfc3339(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /auth/sessions/{id}
///
/// Revoke one of the current player's sessions. A missing id and another
/// player's id are indistinguishable.
///
/// # Errors
/// - 401: Not authenticated
/// - 404: No such session for this player
pub async fn revoke_session(
    ctx: AuthContext,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let player_id = ctx.require_player_id()?;
    let session_id = path.into_inner();

    delete_session(pool.get_ref(), session_id, player_id).await?;

    tracing::info!(
        player_id = %player_id,
        session_id = %session_id,
        "Session revoked"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Session revoked"
    })))
}

/// DELETE /auth/sessions
///
/// Revoke all of the current player's sessions; `?except={id}` spares one
/// (typically the caller's own).
///
/// # Errors
/// - 401: Not authenticated
pub async fn revoke_all_sessions(
    ctx: AuthContext,
    query: web::Query<RevokeAllQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let player_id = ctx.require_player_id()?;

    let revoked = delete_all_sessions(pool.get_ref(), player_id, query.except).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "revoked": revoked
    })))
}
