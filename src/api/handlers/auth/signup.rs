//! Signup and signup-verification endpoints.
//!
//! Flow Overview:
//! 1) `POST /auth/signup` creates the identity with a pending OTP challenge.
//! 2) `POST /auth/verify-signup-otp` consumes the challenge and marks the
//!    identity verified.

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
    NewUser, SignupOutcome, consume_signup_otp, find_user_auth_by_id, find_user_by_identifier,
    insert_user,
};
use super::types::{MessageResponse, SignupRequest, SignupResponse, VerifyOtpRequest};
use super::utils::{extract_client_ip, fail, normalize_identifier, valid_email, valid_password};

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Identity created, OTP issued", body = SignupResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 409, description = "Identifier already registered", body = MessageResponse),
        (status = 429, description = "Rate limited", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    // The limiter runs before anything else so throttled requests cause no
    // validation work and no store access.
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Signup)
        == RateLimitDecision::Limited
    {
        return fail(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        );
    }

    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let full_name = request.full_name.trim().to_string();
    let identifier = normalize_identifier(&request.identifier);
    let password = request.password;

    if full_name.is_empty() || identifier.is_empty() || password.is_empty() {
        return fail(
            StatusCode::BAD_REQUEST,
            "Full name, email/mobile & password required.",
        );
    }

    // A taken identifier answers 409 even when the password would also be
    // rejected.
    match find_user_by_identifier(&pool, &identifier).await {
        Ok(Some(_)) => return fail(StatusCode::CONFLICT, "User already registered."),
        Ok(None) => {}
        Err(err) => {
            error!("Signup lookup failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    }

    if !valid_password(&password) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters.",
        );
    }

    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Signup password hashing failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    };

    let is_email = valid_email(&identifier);
    let code = otp::generate_code();
    let expires_at = otp::expiry(auth_state.config().otp_ttl_seconds());

    let user = NewUser {
        full_name: &full_name,
        email: is_email.then_some(identifier.as_str()),
        mobile: (!is_email).then_some(identifier.as_str()),
        password_hash: &password_hash,
        age: request.age,
        city: request.city.as_deref(),
        address: request.address.as_deref(),
        otp_code: &code,
        otp_expires_at: expires_at,
    };

    match insert_user(&pool, &user).await {
        Ok(SignupOutcome::Created(user_id)) => {
            // Delivery happens after the row is committed and never blocks
            // the response.
            spawn_delivery(auth_state.notifier(), identifier, code);
            (
                StatusCode::CREATED,
                Json(SignupResponse {
                    success: true,
                    user_id: user_id.to_string(),
                    message: "OTP sent to email/mobile for verification.".to_string(),
                }),
            )
                .into_response()
        }
        Ok(SignupOutcome::Conflict) => fail(StatusCode::CONFLICT, "User already registered."),
        Err(err) => {
            error!("Signup failed: {err}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.")
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-signup-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Identity verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired OTP", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify_signup_otp(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    let Ok(user_id) = Uuid::parse_str(request.user_id.trim()) else {
        return fail(StatusCode::BAD_REQUEST, "Invalid user id.");
    };

    match find_user_auth_by_id(&pool, user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Verify signup OTP lookup failed: {err}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.");
        }
    }

    // The consume statement checks code and expiry itself; a failed attempt
    // leaves the stored pair intact so the user may retry.
    match consume_signup_otp(&pool, user_id, &request.otp).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                success: true,
                message: "Signup verified successfully.".to_string(),
            }),
        )
            .into_response(),
        Ok(false) => fail(StatusCode::BAD_REQUEST, "Invalid or expired OTP."),
        Err(err) => {
            error!("Verify signup OTP failed: {err}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::notify::LogNotifier;
    use super::super::rate_limit::{NoopRateLimiter, RateLimiter, SlidingWindowRateLimiter};
    use super::super::state::{AuthConfig, AuthState};
    use super::super::token::TokenIssuer;
    use super::{signup, verify_signup_otp};
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::PgPool;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let tokens = TokenIssuer::new(SecretString::from("signup-test-secret".to_string()), 3600);
        let limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        Arc::new(AuthState::new(config, tokens, limiter, Arc::new(LogNotifier)))
    }

    fn limited_auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let tokens = TokenIssuer::new(SecretString::from("signup-test-secret".to_string()), 3600);
        let limiter: Arc<dyn RateLimiter> = Arc::new(SlidingWindowRateLimiter::new(
            0,
            Duration::from_secs(60),
        ));
        Arc::new(AuthState::new(config, tokens, limiter, Arc::new(LogNotifier)))
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[tokio::test]
    async fn signup_missing_payload() -> Result<()> {
        let response = signup(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signup_requires_all_fields() -> Result<()> {
        let payload = Json(super::SignupRequest {
            full_name: "   ".to_string(),
            identifier: "alice@example.com".to_string(),
            password: "sesamo-malfermu".to_string(),
            age: None,
            city: None,
            address: None,
        });
        let response = signup(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(payload),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["message"], "Full name, email/mobile & password required.");
        Ok(())
    }

    #[tokio::test]
    async fn signup_rate_limited_before_validation() -> Result<()> {
        // Even a missing payload answers 429 once the client is throttled.
        let response = signup(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(limited_auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }

    #[tokio::test]
    async fn signup_unreachable_database_is_server_error() -> Result<()> {
        let payload = Json(super::SignupRequest {
            full_name: "Alice".to_string(),
            identifier: "alice@example.com".to_string(),
            password: "sesamo-malfermu".to_string(),
            age: None,
            city: None,
            address: None,
        });
        let response = signup(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(payload),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[tokio::test]
    async fn verify_signup_otp_missing_payload() -> Result<()> {
        let response = verify_signup_otp(Extension(lazy_pool()?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_signup_otp_rejects_malformed_id() -> Result<()> {
        let payload = Json(super::VerifyOtpRequest {
            user_id: "not-a-uuid".to_string(),
            otp: "123456".to_string(),
        });
        let response = verify_signup_otp(Extension(lazy_pool()?), Some(payload))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["message"], "Invalid user id.");
        Ok(())
    }

    #[tokio::test]
    async fn verify_signup_otp_unreachable_database_is_server_error() -> Result<()> {
        let payload = Json(super::VerifyOtpRequest {
            user_id: uuid::Uuid::new_v4().to_string(),
            otp: "123456".to_string(),
        });
        let response = verify_signup_otp(Extension(lazy_pool()?), Some(payload))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
