//! Bearer-token session checks for protected endpoints.
//!
//! Verification is stateless: the token carries everything, so this module
//! never touches the database and never mutates anything.

use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::Response;
use uuid::Uuid;

use super::token::{TokenError, TokenIssuer};
use super::utils::fail;

/// Resolve the `Authorization` header into an identity id, or answer 401.
///
/// The three failure modes stay distinguishable for callers of the API:
/// missing header, expired token, and everything else.
pub(super) fn require_auth(headers: &HeaderMap, tokens: &TokenIssuer) -> Result<Uuid, Response> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(fail(
            StatusCode::UNAUTHORIZED,
            "No token provided. Authorization denied.",
        ));
    };

    match tokens.verify(&token) {
        Ok(user_id) => Ok(user_id),
        Err(TokenError::Expired) => Err(fail(StatusCode::UNAUTHORIZED, "Token has expired.")),
        Err(TokenError::Invalid) => Err(fail(StatusCode::UNAUTHORIZED, "Invalid token.")),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
