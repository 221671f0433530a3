//! Health probes.
//!
//! Three endpoints with increasing depth: `/health/live` answers for the
//! process alone, `/health/ready` adds a database round trip for
//! orchestrators, and `/health` returns the full JSON status payload.

use crate::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool};
use tokio::time::{Duration, timeout};
use tracing::{Instrument, debug, error, info_span, warn};
use utoipa::ToSchema;

const DB_PROBE_TIMEOUT_SECONDS: u64 = 2;

const APP_HEADER: &str = "X-App";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

impl Health {
    /// Snapshot of the build identity plus the database probe outcome.
    fn current(db_healthy: bool) -> Self {
        let database = if db_healthy { "ok" } else { "error" };
        Self {
            commit: GIT_COMMIT_HASH.to_owned(),
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            database: database.to_owned(),
        }
    }

    /// Compact `name:version:commit` tag carried in the `X-App` header.
    ///
    /// The commit portion stays empty unless a real hash is baked in.
    fn app_tag(&self) -> String {
        let short = if self.commit.len() > 7 {
            &self.commit[..7]
        } else {
            ""
        };
        format!("{}:{}:{}", self.name, self.version, short)
    }
}

#[utoipa::path(
    get,
    path= "/health/live",
    responses (
        (status = 200, description = "Process is up")
    ),
    tag = "health",
)]
/// Liveness probe; no dependencies are consulted.
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path= "/health/ready",
    responses (
        (status = 200, description = "Ready to accept traffic"),
        (status = 503, description = "Dependencies are unavailable")
    ),
    tag = "health",
)]
/// Readiness probe backed by a database round trip.
pub async fn ready(pool: Extension<PgPool>) -> impl IntoResponse {
    let db_healthy = database_healthy(&pool.0).await;
    log_probe_outcome(db_healthy);

    if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database reachable", body = Health),
        (status = 503, description = "Database unreachable", body = Health)
    ),
    tag = "health",
)]
/// Perform a detailed health check.
pub async fn health(method: Method, pool: Extension<PgPool>) -> impl IntoResponse {
    let db_healthy = database_healthy(&pool.0).await;
    log_probe_outcome(db_healthy);

    let health = Health::current(db_healthy);

    // HEAD carries status and headers only.
    let body = if method == Method::HEAD {
        Body::empty().into_response()
    } else {
        Json(&health).into_response()
    };

    let mut headers = HeaderMap::new();
    match health.app_tag().parse::<HeaderValue>() {
        Ok(value) => {
            debug!("{APP_HEADER}: {:?}", value);
            headers.insert(APP_HEADER, value);
        }
        Err(err) => debug!("Skipping unparsable {APP_HEADER} header: {}", err),
    }

    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, headers, body)
}

/// Probe database connectivity used by `/health/ready` and `/health`.
async fn database_healthy(pool: &PgPool) -> bool {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );

    if let Ok(result) = timeout(Duration::from_secs(DB_PROBE_TIMEOUT_SECONDS), async {
        match pool.acquire().instrument(acquire_span).await {
            Ok(mut conn) => {
                let ping_span =
                    info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
                match conn.ping().instrument(ping_span).await {
                    Ok(()) => true,
                    Err(error) => {
                        error!("Database ping failed: {}", error);
                        false
                    }
                }
            }

            Err(error) => {
                error!("Could not acquire a database connection: {}", error);
                false
            }
        }
    })
    .await
    {
        result
    } else {
        warn!("Database probe timed out");
        false
    }
}

/// Log the probe result; never alters the response.
fn log_probe_outcome(db_healthy: bool) {
    if db_healthy {
        debug!("Database probe passed");
    } else {
        debug!("Database probe failed");
    }
}
