//! API handlers.
//!
//! This module organizes the service's route handlers: the OTP-gated auth
//! flows and profile endpoints under `auth`, and the probe endpoints under
//! `health`.

pub mod auth;
pub mod health;
