use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ingest::IngestError;
use publish::PublishError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The body is not a well-formed station submission.
    #[error("Invalid JSON format: {0}")]
    MalformedInput(String),

    /// The submission decoded but its numbers do not add up.
    #[error("{0}")]
    ValidationRejected(#[from] IngestError),

    /// The submission was valid but could not be published.
    #[error("Failed to publish submission: {0}")]
    PublishFailed(#[from] PublishError),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MalformedInput(_) | ServerError::ValidationRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::PublishFailed(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::MalformedInput(_) => "MALFORMED_INPUT",
            ServerError::ValidationRejected(_) => "VALIDATION_REJECTED",
            ServerError::PublishFailed(_) => "PUBLISH_FAILED",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::ValidationRejected(err) => Some(json!({
                "reason": err.kind(),
                "retryable": false,
            })),
            ServerError::PublishFailed(err) => Some(json!({
                "reason": err.kind(),
                "retryable": err.is_retryable(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request_failed");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Rejected(err) => ServerError::ValidationRejected(err),
            PipelineError::Publish(err) => ServerError::PublishFailed(err),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::MalformedInput(rejection.body_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_and_publish_failures_map_to_distinct_codes() {
        let rejected = ServerError::from(PipelineError::Rejected(
            IngestError::CandidateSumMismatch {
                valid_ballots: 100,
                candidate_total: 90,
            },
        ));
        assert_eq!(rejected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(rejected.error_code(), "VALIDATION_REJECTED");
        assert!(rejected.to_string().contains("90"));

        let failed = ServerError::from(PipelineError::Publish(PublishError::Transport(
            "broker down".into(),
        )));
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.error_code(), "PUBLISH_FAILED");
    }

    #[test]
    fn publish_details_report_retryability() {
        let err = ServerError::PublishFailed(PublishError::Closed);
        let details = err.details().unwrap();
        assert_eq!(details["reason"], "closed");
        assert_eq!(details["retryable"], true);
    }

    #[test]
    fn refused_publish_is_not_advertised_as_retryable() {
        let err = ServerError::PublishFailed(PublishError::Refused(
            "Broker: Message size too large".into(),
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let details = err.details().unwrap();
        assert_eq!(details["reason"], "refused");
        assert_eq!(details["retryable"], false);
    }
}
