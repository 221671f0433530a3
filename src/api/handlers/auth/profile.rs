//! Authenticated profile endpoints.
//!
//! Flow Overview:
//! 1) Resolve the bearer token into an identity id (no database involved).
//! 2) Fetch or patch the profile row for that id.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::session::require_auth;
use super::state::AuthState;
use super::storage::{ProfileRecord, ProfileUpdateOutcome, fetch_profile, update_profile};
use super::types::{
    Gender, MessageResponse, Profile, ProfileResponse, ProfileUpdateRequest, ProfileUpdateResponse,
};
use super::utils::fail;

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Authenticated profile", body = ProfileResponse),
        (status = 401, description = "Missing, expired, or invalid token", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn get_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let user_id = match require_auth(&headers, auth_state.tokens()) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match fetch_profile(&pool, user_id).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(ProfileResponse {
                success: true,
                user: profile_from(record),
            }),
        )
            .into_response(),
        Ok(None) => fail(StatusCode::NOT_FOUND, "User not found."),
        Err(err) => {
            error!("Profile fetch failed: {err}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.")
        }
    }
}

#[utoipa::path(
    patch,
    path = "/auth/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileUpdateResponse),
        (status = 400, description = "Empty update payload", body = MessageResponse),
        (status = 401, description = "Missing, expired, or invalid token", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse),
        (status = 409, description = "Email or mobile already in use", body = MessageResponse),
        (status = 500, description = "Server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn patch_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ProfileUpdateRequest>>,
) -> impl IntoResponse {
    let user_id = match require_auth(&headers, auth_state.tokens()) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let request: ProfileUpdateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return fail(StatusCode::BAD_REQUEST, "Missing payload"),
    };

    if request.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "No fields to update.");
    }

    match update_profile(&pool, user_id, &request).await {
        Ok(ProfileUpdateOutcome::Updated(record)) => (
            StatusCode::OK,
            Json(ProfileUpdateResponse {
                success: true,
                message: "Profile updated successfully.".to_string(),
                user: profile_from(record),
            }),
        )
            .into_response(),
        Ok(ProfileUpdateOutcome::Missing) => fail(StatusCode::NOT_FOUND, "User not found."),
        Ok(ProfileUpdateOutcome::Conflict) => {
            fail(StatusCode::CONFLICT, "Email or mobile already in use.")
        }
        Err(err) => {
            error!("Profile update failed: {err}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Server error.")
        }
    }
}

fn profile_from(record: ProfileRecord) -> Profile {
    Profile {
        id: record.id,
        full_name: record.full_name,
        email: record.email,
        mobile: record.mobile,
        alternate_mobile: record.alternate_mobile,
        age: record.age,
        dob: record.dob,
        address: record.address,
        city: record.city,
        state: record.state,
        pincode: record.pincode,
        gender: record.gender.as_deref().and_then(Gender::from_db),
        is_verified: record.verified,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::super::notify::LogNotifier;
    use super::super::rate_limit::{NoopRateLimiter, RateLimiter};
    use super::super::state::{AuthConfig, AuthState};
    use super::super::token::TokenIssuer;
    use super::{get_profile, patch_profile};
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::PgPool;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let tokens = TokenIssuer::new(SecretString::from("profile-test-secret".to_string()), 3600);
        let limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        Arc::new(AuthState::new(config, tokens, limiter, Arc::new(LogNotifier)))
    }

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    fn bearer_headers(state: &AuthState) -> Result<HeaderMap> {
        let token = state
            .tokens()
            .issue(uuid::Uuid::new_v4())
            .map_err(|err| anyhow::anyhow!("issue token: {err}"))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        Ok(headers)
    }

    #[tokio::test]
    async fn get_profile_requires_token() -> Result<()> {
        let response = get_profile(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["message"], "No token provided. Authorization denied.");
        Ok(())
    }

    #[tokio::test]
    async fn get_profile_rejects_garbage_token() -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer junk"));
        let response = get_profile(headers, Extension(lazy_pool()?), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["message"], "Invalid token.");
        Ok(())
    }

    #[tokio::test]
    async fn get_profile_unreachable_database_is_server_error() -> Result<()> {
        let state = auth_state();
        let headers = bearer_headers(&state)?;
        let response = get_profile(headers, Extension(lazy_pool()?), Extension(state))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[tokio::test]
    async fn patch_profile_missing_payload() -> Result<()> {
        let state = auth_state();
        let headers = bearer_headers(&state)?;
        let response = patch_profile(headers, Extension(lazy_pool()?), Extension(state), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn patch_profile_rejects_empty_update() -> Result<()> {
        let state = auth_state();
        let headers = bearer_headers(&state)?;
        let payload = Json(super::ProfileUpdateRequest::default());
        let response = patch_profile(
            headers,
            Extension(lazy_pool()?),
            Extension(state),
            Some(payload),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(value["message"], "No fields to update.");
        Ok(())
    }

    #[tokio::test]
    async fn patch_profile_requires_token_before_payload_checks() -> Result<()> {
        let response = patch_profile(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
