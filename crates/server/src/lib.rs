//! Tally Server - HTTP intake for polling-station results
//!
//! This crate exposes the tally pipeline over HTTP. A station submits its
//! count, the server checks that the numbers add up, derives the station's
//! idempotency key and publishes the record to a partitioned stream keyed by
//! that identifier.
//!
//! # Features
//!
//! - **Middleware**: CORS, request ID tracking, structured logging, timeouts
//! - **Configuration**: Environment variable and file-based configuration
//! - **Error Handling**: JSON error bodies with stable error codes
//! - **Graceful Shutdown**: The publisher is flushed after the listener stops
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /api/stations/submit` - Submit a station tally
//!   - `202` accepted, body carries `tracking_id`
//!   - `400` `MALFORMED_INPUT` or `VALIDATION_REJECTED`
//!   - `500` `PUBLISH_FAILED`, safe to retry unchanged
//! - `GET /api/health` - Status probe
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe with publisher counters
//! - `GET /metrics` - Prometheus metrics
//! - `GET /` - API information

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
