//! Error types for the publish crate.
//!
//! Everything in here is a transport-side failure. A submission that reaches
//! the publisher has already passed validation, so none of these errors say
//! anything about the tally itself.
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors reported by a [`StationPublisher`](crate::StationPublisher).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PublishError {
    /// The publisher configuration was rejected before a client was built.
    #[error("invalid publisher configuration: {0}")]
    Config(#[from] ConfigError),

    /// The stream client could not be created.
    #[error("failed to create stream client: {0}")]
    Client(String),

    /// The payload could not be encoded as JSON.
    #[error("failed to encode payload: {0}")]
    Serialization(String),

    /// The stream refused or failed to deliver the message.
    #[error("stream delivery failed: {0}")]
    Transport(String),

    /// The stream refused the message for a reason a resend will not fix,
    /// such as an oversized record or a missing topic ACL.
    #[error("stream refused the message: {0}")]
    Refused(String),

    /// The publish did not complete within the caller's deadline.
    ///
    /// The message may still reach the stream afterwards.
    #[error("publish did not complete within {}ms", .0.as_millis())]
    DeadlineExceeded(Duration),

    /// The publisher has been closed and accepts no more messages.
    #[error("publisher is closed")]
    Closed,
}

impl PublishError {
    /// Whether resubmitting the same record may succeed.
    ///
    /// Repeated publishes of one station carry the same key, so consumers
    /// can collapse duplicates and a retry is safe to attempt. A
    /// [`Refused`](PublishError::Refused) message will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PublishError::Transport(_) | PublishError::DeadlineExceeded(_) | PublishError::Closed
        )
    }

    /// Stable snake_case label, used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Config(_) => "config",
            PublishError::Client(_) => "client",
            PublishError::Serialization(_) => "serialization",
            PublishError::Transport(_) => "transport",
            PublishError::Refused(_) => "refused",
            PublishError::DeadlineExceeded(_) => "deadline_exceeded",
            PublishError::Closed => "closed",
        }
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Serialization(err.to_string())
    }
}
