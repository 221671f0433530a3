//! # Ensaluti (OTP Sign-in & Session Issuance)
//!
//! `ensaluti` is the identity backend of a community book marketplace. It
//! owns user registration, OTP verification, signin via password or one-time
//! code, forgot/reset password, session-token issuance, and the profile
//! surface gated by those sessions.
//!
//! ## Verification Model
//!
//! Every account starts unverified with a pending 6-digit OTP. A session
//! token is only issuable after the signup OTP has been consumed; the
//! no-signin-while-unverified rule is enforced on every signin path.
//!
//! - **Single outstanding code:** issuing a new OTP overwrites the previous
//!   one; the old code becomes permanently invalid.
//! - **Single use:** a code is cleared atomically on successful
//!   verification; failed attempts leave it intact until its 5-minute
//!   expiry.
//!
//! ## Sessions
//!
//! Session tokens are HS256-signed JWTs carrying the user id as the sole
//! identity claim, valid for 7 days from issuance with no refresh or
//! revocation. Protected routes present them as `Authorization: Bearer`.
//!
//! ## Throttling
//!
//! Signup, signin, forgot-password, and reset-password are throttled per
//! originating client with a sliding window (10 requests per 15 minutes);
//! throttled requests cause no state transition.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Builds outside a git checkout have no hash to validate.
            return;
        }
        // Full SHA-1 is 40 hex chars; abbreviated forms are fine too.
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "expected a hex commit hash, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "expected at least 7 hash characters, got: {GIT_COMMIT_HASH}"
        );
    }
}
