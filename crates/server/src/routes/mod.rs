//! API route handlers
//!
//! - `health`: liveness, readiness, the legacy `/api/health` probe and metrics
//! - `stations`: station tally submission

pub mod health;
pub mod stations;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
///
/// # Response
///
/// ```json
/// {
///   "name": "Tally Server",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Tally Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/stations/submit",
            "/api/health",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
