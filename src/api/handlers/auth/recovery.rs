//! Password recovery endpoints.
//!
//! Flow Overview:
//! 1) `POST /auth/forgot-password` issues an OTP challenge for the identity.
//! 2) `POST /auth/reset-password` consumes the challenge and replaces the
//!    password hash in the same statement.
//!
//! Both entry points are throttled; recovery works for unverified identities
//! too, since it never issues a session.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::notify::spawn_delivery;
use super::otp;
use super::password::hash_password;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{
    consume_otp_set_password, find_user_auth_by_id, find_user_by_identifier, store_otp,
};
use super::types::{
    ForgotPasswordRequest, MessageResponse, OtpPendingResponse, ResetPasswordRequest,
};
use super::utils::{extract_client_ip, fail, normalize_identifier, valid_password};

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset OTP issued", body = OtpPendingResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ForgotPassword)
        == RateLimitDecision::Limited
    {
        return fail(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        );
    }

    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let identifier = normalize_identifier(&request.identifier);
    let user = match find_user_by_identifier(&pool, &identifier).await {
        Ok(Some(user)) => user,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Forgot password lookup failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    let code = otp::generate_code();
    let expires_at = otp::expiry(auth_state.config().otp_ttl_seconds());

    if let Err(err) = store_otp(&pool, user.id, &code, expires_at).await {
        error!("Forgot password OTP store failed: {err}");
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
    }

    let destination = user.email.or(user.mobile).unwrap_or_default();
    spawn_delivery(auth_state.notifier(), destination, code);

    (
        StatusCode::OK,
        Json(OtpPendingResponse {
            success: true,
            user_id: user.id.to_string(),
            message: "OTP sent for password reset.".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid OTP or short password", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResetPassword)
        == RateLimitDecision::Limited
    {
        return fail(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        );
    }

    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let Ok(user_id) = Uuid::parse_str(request.user_id.trim()) else {
        return fail(StatusCode::BAD_REQUEST, "Invalid user id.");
    };

    if !valid_password(&request.new_password) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters.",
        );
    }

    match find_user_auth_by_id(&pool, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Reset password lookup failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    }

    let password_hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Reset password hashing failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    match consume_otp_set_password(&pool, user_id, &request.otp, &password_hash).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Password reset successful.".to_string(),
            }),
        )
            .into_response(),
        Ok(false) => fail(StatusCode::BAD_REQUEST, "Invalid or expired OTP."),
        Err(err) => {
            error!("Reset password failed: {err}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.")
        }
    }
}
