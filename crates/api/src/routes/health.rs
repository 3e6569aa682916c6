use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Round trip of the probe query, when it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_latency_ms: Option<u64>,
}

/// GET /health
///
/// 200 when the database answers, 503 otherwise. Unauthenticated so load
/// balancers can probe it.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let probe = orderflow_db::health_check(&state.pool).await;
    let latency = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (code, body) = match probe {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                db_healthy: true,
                db_latency_ms: Some(latency),
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    db_healthy: false,
                    db_latency_ms: None,
                },
            )
        }
    };
    (code, Json(body))
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
