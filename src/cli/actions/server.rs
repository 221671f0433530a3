use crate::api;
use crate::api::handlers::auth::AuthConfig;
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub token_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub otp_ttl_seconds: i64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_rate_limit_max_requests(args.rate_limit_max_requests)
        .with_rate_limit_window_seconds(args.rate_limit_window_seconds);

    api::new(args.port, args.dsn, auth_config, args.token_secret).await
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        frontend_base_url = %args.frontend_base_url,
        session_ttl_seconds = args.session_ttl_seconds,
        otp_ttl_seconds = args.otp_ttl_seconds,
        rate_limit_max_requests = args.rate_limit_max_requests,
        rate_limit_window_seconds = args.rate_limit_window_seconds,
        "Starting server"
    );
}
