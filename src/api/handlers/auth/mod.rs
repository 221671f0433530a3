//! Auth handlers and supporting modules.
//!
//! This module coordinates OTP-gated signup and signin, password recovery,
//! and profile access for a single `users` table.
//!
//! ## Throttling
//!
//! The flow entry points (signup, signin, forgot/reset password) are
//! rate-limited per originating client before any validation or store
//! access: 10 requests per 15-minute sliding window by default. The OTP
//! submission endpoints for signup and signin are not throttled.
//!
//! ## Sessions
//!
//! Sessions are stateless HS256 tokens valid for 7 days from issuance.
//! There is no refresh and no server-side revocation; protected endpoints
//! verify the bearer token without touching the database.

mod notify;
mod otp;
mod password;
pub(crate) mod profile;
mod rate_limit;
pub(crate) mod recovery;
mod session;
pub(crate) mod signin;
pub(crate) mod signup;
mod state;
mod storage;
mod token;
pub(crate) mod types;
mod utils;

pub use notify::{LogNotifier, OtpNotifier};
pub use rate_limit::{NoopRateLimiter, RateLimiter, SlidingWindowRateLimiter};
pub use state::{AuthConfig, AuthState};
pub use token::TokenIssuer;
