/// Password Reset Routes
///
/// The reset flow runs a separate token class through its own ledger and
/// never touches the session store.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{consume_reset_token, request_password_reset, verify_reset_token};
use crate::configuration::JwtSettings;
use crate::email_client::EmailClient;
use crate::error::AppError;
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct RequestResetBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyResetQuery {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ConfirmResetBody {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct VerifyResetResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// POST /auth/password-reset/request
///
/// Always reports success, whether or not the email is registered; the
/// endpoint must not be usable to probe for accounts. A malformed address
/// gets the same response without touching the database.
///
/// # Errors
/// - 500/503: Database or signing failure only
pub async fn request_reset(
    form: web::Json<RequestResetBody>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    match is_valid_email(&form.email) {
        Ok(email) => {
            request_password_reset(
                pool.get_ref(),
                email_client.get_ref(),
                jwt_config.get_ref(),
                &email,
            )
            .await?;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password reset requested for malformed email");
        }
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

/// GET /auth/password-reset/verify?token=...
///
/// Check a reset token without consuming it. Fails closed: any invalid,
/// expired, used, or unknown token simply reports `valid: false`.
///
/// # Errors
/// - 500/503: Database failure only
pub async fn verify_reset(
    query: web::Query<VerifyResetQuery>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let email = verify_reset_token(pool.get_ref(), jwt_config.get_ref(), &query.token).await?;

    Ok(HttpResponse::Ok().json(VerifyResetResponse {
        valid: email.is_some(),
        email,
    }))
}

/// POST /auth/password-reset/confirm
///
/// Consume a reset token and set the new password. Succeeds at most once
/// per token; repeats, expired, and forged tokens all fail the same way.
///
/// # Errors
/// - 400: Invalid reset token, or a too-weak replacement password
/// - 500/503: Database failure
pub async fn confirm_reset(
    form: web::Json<ConfirmResetBody>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    consume_reset_token(
        pool.get_ref(),
        jwt_config.get_ref(),
        &form.token,
        &form.new_password,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password reset successful"
    })))
}
