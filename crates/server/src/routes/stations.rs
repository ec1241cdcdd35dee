use crate::error::ServerResult;
use crate::middleware::RequestId;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use ingest::RawStationResult;
use publish::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response for an accepted station submission
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    /// The station's idempotency key
    pub tracking_id: String,
    pub delivery: DeliveryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// Accept one station's tally
///
/// Returns 202 once the record has been handed to the stream. Malformed JSON
/// and inconsistent tallies are answered with 400, publish failures with 500.
pub async fn submit_station(
    State(state): State<Arc<ServerState>>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<RawStationResult>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(raw) = payload?;

    let receipt =
        tally::submit_station_result(raw, state.pipeline(), state.publisher.as_ref()).await?;

    tracing::info!(
        tracking_id = %receipt.tracking_id,
        request_id = request_id.as_ref().map(|Extension(id)| id.0.as_str()).unwrap_or_default(),
        "station_submission_accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            message: "Station result accepted".to_string(),
            tracking_id: receipt.tracking_id,
            delivery: receipt.publish.delivery,
            partition: receipt.publish.partition,
            offset: receipt.publish.offset,
        }),
    ))
}
