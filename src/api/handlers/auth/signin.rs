//! Signin endpoints, password and OTP flavors.
//!
//! Flow Overview:
//! 1) `POST /auth/signin` with a password answers a session token directly;
//!    with `useOtp` it issues an OTP challenge instead.
//! 2) `POST /auth/verify-signin-otp` consumes the challenge and answers the
//!    session token.
//!
//! Unverified identities are rejected on every path here, including the
//! challenge submission.

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
use super::password::verify_password;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{
    UserRecord, consume_otp, find_user_auth_by_id, find_user_by_identifier, store_otp,
};
use super::types::{
    MessageResponse, OtpPendingResponse, SessionTokenResponse, SigninRequest, UserSummary,
    VerifyOtpRequest,
};
use super::utils::{extract_client_ip, fail, normalize_identifier};

#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Session token or pending OTP", body = SessionTokenResponse),
        (status = 400, description = "Invalid credentials", body = MessageResponse),
        (status = 403, description = "Account not verified", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn signin(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> impl IntoResponse {
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Signin)
        == RateLimitDecision::Limited
    {
        return fail(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        );
    }

    let request: SigninRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let identifier = normalize_identifier(&request.identifier);
    let user = match find_user_by_identifier(&pool, &identifier).await {
        Ok(Some(user)) => user,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Signin lookup failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    if !user.verified {
        return fail(StatusCode::FORBIDDEN, "Account not verified.");
    }

    if request.use_otp {
        return issue_signin_otp(&pool, &auth_state, &user).await;
    }

    let matches = request
        .password
        .as_deref()
        .is_some_and(|password| verify_password(password, &user.password_hash));
    if !matches {
        return fail(StatusCode::BAD_REQUEST, "Invalid credentials.");
    }

    let token = match auth_state.tokens().issue(user.id) {
        Ok(token) => token,
        Err(err) => {
            error!("Signin token issuance failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    (
        StatusCode::OK,
        Json(SessionTokenResponse {
            success: true,
            message: "Signin successful.".to_string(),
            token,
            user: summarize(user),
        }),
    )
        .into_response()
}

/// Overwrite any live challenge with a fresh OTP and queue its delivery.
async fn issue_signin_otp(
    pool: &PgPool,
    auth_state: &AuthState,
    user: &UserRecord,
) -> axum::response::Response {
    let code = otp::generate_code();
    let expires_at = otp::expiry(auth_state.config().otp_ttl_seconds());

    if let Err(err) = store_otp(pool, user.id, &code, expires_at).await {
        error!("Signin OTP store failed: {err}");
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
    }

    let destination = user
        .email
        .clone()
        .or_else(|| user.mobile.clone())
        .unwrap_or_default();
    spawn_delivery(auth_state.notifier(), destination, code);

    (
        StatusCode::OK,
        Json(OtpPendingResponse {
            success: true,
            user_id: user.id.to_string(),
            message: "OTP sent.".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/auth/verify-signin-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Session token issued", body = SessionTokenResponse),
        (status = 400, description = "Invalid or expired OTP", body = MessageResponse),
        (status = 403, description = "Account not verified", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify_signin_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let Ok(user_id) = Uuid::parse_str(request.user_id.trim()) else {
        return fail(StatusCode::BAD_REQUEST, "Invalid user id.");
    };

    let user = match find_user_auth_by_id(&pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return fail(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Verify signin OTP lookup failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    // A pending-verification identity cannot turn a signin challenge into a
    // session.
    if !user.verified {
        return fail(StatusCode::FORBIDDEN, "Account not verified.");
    }

    match consume_otp(&pool, user.id, &request.otp).await {
        Ok(true) => {}
        Ok(false) => return fail(StatusCode::BAD_REQUEST, "Invalid or expired OTP."),
        Err(err) => {
            error!("Verify signin OTP failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    }

    let token = match auth_state.tokens().issue(user.id) {
        Ok(token) => token,
        Err(err) => {
            error!("Signin token issuance failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    (
        StatusCode::OK,
        Json(SessionTokenResponse {
            success: true,
            message: "Signin verified successfully.".to_string(),
            token,
            user: summarize(user),
        }),
    )
        .into_response()
}

fn summarize(user: UserRecord) -> UserSummary {
    UserSummary {
        id: user.id.to_string(),
        full_name: user.full_name,
        email: user.email,
        mobile: user.mobile,
    }
}
