//! Rate limiting primitives for auth flows.
//!
//! The limiter is an injected capability on [`super::AuthState`]; handlers
//! check it before any validation or store access so a throttled request
//! causes no state transition.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Shared bucket for requests whose client address cannot be resolved.
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Signup,
    Signin,
    ForgotPassword,
    ResetPassword,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// In-memory sliding window keyed by `(action, client)`.
///
/// Each allowed request leaves a timestamp; a request is limited once
/// `max_requests` timestamps remain inside the window. Entries older than the
/// window are pruned on every check, so the map stays bounded by live
/// clients.
pub struct SlidingWindowRateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<(RateLimitAction, String), Vec<Instant>>>,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = (action, ip.unwrap_or(UNKNOWN_CLIENT).to_string());
        let now = Instant::now();

        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        hits.retain(|_, stamps| {
            stamps.retain(|stamp| now.duration_since(*stamp) < self.window);
            !stamps.is_empty()
        });

        let stamps = hits.entry(key).or_default();
        if stamps.len() >= self.max_requests {
            return RateLimitDecision::Limited;
        }
        stamps.push(now);
        RateLimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Signup),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signin),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn sliding_window_limits_after_max_requests() {
        let limiter = SlidingWindowRateLimiter::new(10, Duration::from_secs(900));
        for _ in 0..10 {
            assert_eq!(
                limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn sliding_window_keys_per_client() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(900));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Limited
        );
        assert_eq!(
            limiter.check_ip(Some("5.6.7.8"), RateLimitAction::Signup),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn sliding_window_keys_per_action() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(900));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signin),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn sliding_window_shares_bucket_for_unknown_clients() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(900));
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::ForgotPassword),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::ForgotPassword),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn sliding_window_frees_slots_once_window_passes() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_millis(40));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Limited
        );
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Signup),
            RateLimitDecision::Allowed
        );
    }
}
