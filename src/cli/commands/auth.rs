use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    let command = with_otp_args(command);
    with_throttle_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend origin allowed to call the API with credentials")
                .env("ENSALUTI_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("token-secret")
                .long("token-secret")
                .help("HMAC secret used to sign session tokens")
                .env("ENSALUTI_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session token TTL in seconds")
                .env("ENSALUTI_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_otp_args(command: Command) -> Command {
    command.arg(
        Arg::new("otp-ttl-seconds")
            .long("otp-ttl-seconds")
            .help("One-time code TTL in seconds")
            .env("ENSALUTI_OTP_TTL_SECONDS")
            .default_value("300")
            .value_parser(clap::value_parser!(i64)),
    )
}

fn with_throttle_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("rate-limit-max-requests")
                .long("rate-limit-max-requests")
                .help("Requests allowed per client within the rate-limit window")
                .env("ENSALUTI_RATE_LIMIT_MAX_REQUESTS")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("rate-limit-window-seconds")
                .long("rate-limit-window-seconds")
                .help("Sliding rate-limit window size in seconds")
                .env("ENSALUTI_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
}
