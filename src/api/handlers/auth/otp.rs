//! One-time code generation.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Generate a 6-digit code, uniformly distributed over 100000..=999999.
pub(super) fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Expiry for a code issued now.
pub(super) fn expiry(ttl_seconds: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(ttl_seconds)
}
