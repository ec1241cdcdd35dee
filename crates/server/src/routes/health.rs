use crate::error::{ServerError, ServerResult};
use crate::state::{ServerMetadata, ServerState};
use crate::telemetry;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "tally-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Status probe kept at its historical path for existing dashboards
pub async fn api_health(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "UP",
        "publisher": {
            "delivery": state.publisher.delivery_mode(),
            "topic": state.pipeline().publisher.topic,
        },
    }))
}

/// Readiness check endpoint
/// Reports the publisher's delivery counters alongside the server metadata
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let metadata = ServerMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
    };

    Ok(Json(json!({
        "status": "ready",
        "service": "tally-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "server": metadata,
        "components": {
            "api": "ready",
            "publisher": {
                "backend": state.pipeline().publisher.backend,
                "delivery": state.publisher.delivery_mode(),
                "stats": state.publisher.stats(),
            },
        }
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.metrics.as_ref().ok_or(ServerError::NotFound)?;

    telemetry::record_publisher_stats(state.publisher.stats());

    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
