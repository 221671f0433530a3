//! Small helpers for auth validation and client identification.

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::MessageResponse;

/// Minimum accepted password length, in characters.
pub(super) const MIN_PASSWORD_CHARS: usize = 6;

/// Postgres SQLSTATE reported on unique constraint violations.
const UNIQUE_VIOLATION_SQLSTATE: &str = "23505";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";

static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Build the canonical `{success: false, message}` failure envelope.
pub(super) fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            success: false,
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Normalize a signup/signin identifier for lookup and uniqueness checks.
///
/// Email identifiers are lowercased; mobile identifiers are only trimmed.
pub(super) fn normalize_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if valid_email(trimmed) {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Email shape check, also used to classify an identifier as email vs mobile.
pub(super) fn valid_email(identifier: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|regex| regex.is_match(identifier))
}

/// Password policy shared by signup and reset.
pub(super) fn valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_CHARS
}

/// True when a store error carries the unique-violation SQLSTATE.
pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION_SQLSTATE)
}

/// First non-blank entry of a comma separated forwarding list.
fn first_forwarded_entry(list: &str) -> Option<&str> {
    let entry = list.split(',').next()?.trim();
    (!entry.is_empty()).then_some(entry)
}

/// Client address used as the throttle key, taken from proxy headers.
///
/// `X-Forwarded-For` wins when its first entry is usable, then `X-Real-Ip`.
pub(super) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let header_str = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    if let Some(ip) = header_str(FORWARDED_FOR_HEADER).and_then(first_forwarded_entry) {
        return Some(ip.to_string());
    }

    let real_ip = header_str(REAL_IP_HEADER)?.trim();
    (!real_ip.is_empty()).then(|| real_ip.to_string())
}
