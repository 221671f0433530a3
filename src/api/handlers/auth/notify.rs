//! OTP delivery capability.
//!
//! Delivery runs after the issuing state transition commits: the handler
//! spawns a task and answers without waiting. A failed delivery is logged
//! and never rolls back state or blocks the response. There is no queue and
//! no retry.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

pub trait OtpNotifier: Send + Sync {
    fn deliver(&self, destination: &str, code: &str) -> Result<()>;
}

/// Writes codes to the structured log, standing in for an email/SMS channel.
#[derive(Clone, Debug)]
pub struct LogNotifier;

impl OtpNotifier for LogNotifier {
    fn deliver(&self, destination: &str, code: &str) -> Result<()> {
        info!(destination = %destination, code = %code, "otp delivery stub");
        Ok(())
    }
}

/// Fire-and-forget delivery on the runtime.
pub(super) fn spawn_delivery(notifier: Arc<dyn OtpNotifier>, destination: String, code: String) {
    tokio::spawn(async move {
        if let Err(err) = notifier.deliver(&destination, &code) {
            error!(destination = %destination, "otp delivery failed: {err}");
        }
    });
}
