use crate::api::handlers::{auth, health};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::options,
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub(crate) mod handlers;
// Route registration and document assembly live in openapi.rs.
mod openapi;

pub use openapi::openapi;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Router with every documented route registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Connect to the store, assemble the router, and serve until ctrl-c.
///
/// # Errors
///
/// Returns an error when the database is unreachable, the frontend origin is
/// not a usable URL, or the listener cannot bind.
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: auth::AuthConfig,
    token_secret: SecretString,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(120))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to Postgres")?;

    // Read everything the server wiring needs before the config moves into AuthState.
    let frontend_origin = frontend_origin(auth_config.frontend_base_url())?;
    let tokens = auth::TokenIssuer::new(token_secret, auth_config.session_ttl_seconds());
    let rate_limiter = Arc::new(auth::SlidingWindowRateLimiter::new(
        auth_config.rate_limit_max_requests(),
        Duration::from_secs(auth_config.rate_limit_window_seconds()),
    ));
    let auth_state = Arc::new(auth::AuthState::new(
        auth_config,
        tokens,
        rate_limiter,
        Arc::new(auth::LogNotifier),
    ));

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    // Build the router from OpenAPI-wired routes, then extend it with non-doc routes like the
    // preflight-only `OPTIONS /health`. The OpenAPI document itself is emitted by the `openapi`
    // binary.
    let (router, _doc) = router().split_for_parts();
    let app = router
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_request: &Request<Body>| HeaderValue::try_from(Ulid::new().to_string()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(pool.clone()))
                .layer(Extension(auth_state.clone())),
        )
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{port}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// Per-request span carrying the method, matched route, and request id.
fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("none");

    let route = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str(),
        None => request.uri().path(),
    };

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = route,
        request_id
    )
}

/// Reduce the configured frontend URL to its origin (scheme + host + explicit
/// port) for the CORS allowlist.
fn frontend_origin(base_url: &str) -> Result<HeaderValue> {
    let url =
        Url::parse(base_url).with_context(|| format!("Unparsable frontend base URL: {base_url}"))?;

    if url.host_str().is_none() {
        return Err(anyhow!("Frontend base URL needs a host: {base_url}"));
    }

    let origin = url.origin().ascii_serialization();
    HeaderValue::from_str(&origin)
        .with_context(|| format!("Frontend origin is not a valid header value: {origin}"))
}
