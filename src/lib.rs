//! Workspace umbrella crate for station tally intake.
//!
//! This crate stitches together validation and publishing so callers can take
//! a decoded station submission all the way to the stream with a single entry
//! point: [`submit_station_result`].

pub mod config;

pub use config::{ConfigLoadError, PipelineConfig};
pub use ingest::{
    CandidateVote, ConfigError as IngestConfigError, IngestConfig, IngestError, RawCandidateVote,
    RawStationResult, StationResultPayload, derive_key, ingest, validate,
};
pub use publish::{
    DeliveryMode, Fault, InMemoryPublisher, PublishError, PublishReceipt, PublisherBackend,
    PublisherConfig, PublisherStats, StationPublisher, publish,
};
#[cfg(feature = "kafka")]
pub use publish::KafkaPublisher;

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// Errors that can occur while taking a submission through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The tally does not add up. Resubmitting it unchanged fails again.
    Rejected(IngestError),
    /// The tally was valid but could not be handed to the stream.
    Publish(PublishError),
}

impl PipelineError {
    /// Whether the caller may resubmit the same tally unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Rejected(_) => false,
            PipelineError::Publish(err) => err.is_retryable(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Rejected(err) => write!(f, "validation rejected: {err}"),
            PipelineError::Publish(err) => write!(f, "publish failed: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Rejected(err) => Some(err),
            PipelineError::Publish(err) => Some(err),
        }
    }
}

impl From<IngestError> for PipelineError {
    fn from(value: IngestError) -> Self {
        PipelineError::Rejected(value)
    }
}

impl From<PublishError> for PipelineError {
    fn from(value: PublishError) -> Self {
        PipelineError::Publish(value)
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_ingest(&self, latency: Duration, result: Result<(), IngestError>);
    fn record_publish(&self, latency: Duration, result: Result<(), PublishError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_ingest(self, result: Result<(), IngestError>) {
        self.recorder.record_ingest(self.start.elapsed(), result);
    }

    fn record_publish(self, result: Result<(), PublishError>) {
        self.recorder.record_publish(self.start.elapsed(), result);
    }
}

/// What an accepted submission produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    /// The station's idempotency key, returned to the submitter.
    pub tracking_id: String,
    pub payload: StationResultPayload,
    pub publish: PublishReceipt,
}

/// Validate a submission, derive its key and publish it.
///
/// A rejected submission never reaches the publisher. An accepted one is
/// published exactly once, keyed by its idempotency key, on the topic from
/// `cfg.publisher` and within `cfg.publish_timeout_ms`.
pub async fn submit_station_result(
    raw: RawStationResult,
    cfg: &PipelineConfig,
    publisher: &dyn StationPublisher,
) -> Result<SubmissionReceipt, PipelineError> {
    let ingest_metrics = MetricsSpan::start();
    let payload = match ingest(raw, &cfg.ingest) {
        Ok(payload) => {
            if let Some(span) = ingest_metrics {
                span.record_ingest(Ok(()));
            }
            payload
        }
        Err(err) => {
            if let Some(span) = ingest_metrics {
                span.record_ingest(Err(err.clone()));
            }
            return Err(err.into());
        }
    };

    let publish_metrics = MetricsSpan::start();
    let result = publish(
        publisher,
        &cfg.publisher.topic,
        payload.partition_key(),
        &payload,
        cfg.publish_timeout(),
    )
    .await;
    if let Some(span) = publish_metrics {
        span.record_publish(result.as_ref().map(|_| ()).map_err(|err| err.clone()));
    }
    let receipt = result?;

    info!(
        tracking_id = %payload.idempotency_key,
        partition = receipt.partition,
        offset = receipt.offset,
        "submission_accepted"
    );

    Ok(SubmissionReceipt {
        tracking_id: payload.idempotency_key.clone(),
        payload,
        publish: receipt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consistent_station() -> RawStationResult {
        RawStationResult {
            idempotency_key: None,
            district_id: 5,
            station_id: 12,
            voters_count: 105,
            valid_ballots: 100,
            invalid_ballots: 3,
            no_votes: 2,
            candidate_votes: vec![
                RawCandidateVote {
                    candidate_id: 1,
                    votes: 60,
                },
                RawCandidateVote {
                    candidate_id: 2,
                    votes: 40,
                },
            ],
        }
    }

    #[tokio::test]
    async fn accepted_submission_is_published_once() {
        let publisher = InMemoryPublisher::new(4, DeliveryMode::SyncAck);
        let cfg = PipelineConfig::default();

        let receipt = submit_station_result(consistent_station(), &cfg, &publisher)
            .await
            .expect("pipeline should succeed");

        assert_eq!(receipt.tracking_id, "district_5_station_12");
        assert_eq!(publisher.len(), 1);

        let recorded = &publisher.messages()[0];
        assert_eq!(recorded.topic, "station-results");
        assert_eq!(recorded.key, "district_5_station_12");
        let decoded: StationResultPayload =
            serde_json::from_slice(&recorded.value).expect("payload is JSON");
        assert_eq!(decoded, receipt.payload);
    }

    #[tokio::test]
    async fn rejected_submission_is_not_published() {
        let publisher = InMemoryPublisher::default();
        let raw = RawStationResult {
            voters_count: 104,
            ..consistent_station()
        };

        let err = submit_station_result(raw, &PipelineConfig::default(), &publisher)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Rejected(IngestError::TurnoutMismatch { .. })
        ));
        assert!(!err.is_retryable());
        assert!(publisher.is_empty());
        assert_eq!(publisher.stats(), PublisherStats::default());
    }

    #[derive(Default)]
    struct CountingMetrics {
        events: RwLock<Vec<&'static str>>,
    }

    impl CountingMetrics {
        fn snapshot(&self) -> Vec<&'static str> {
            self.events.read().unwrap().clone()
        }
    }

    impl PipelineMetrics for CountingMetrics {
        fn record_ingest(&self, _latency: Duration, result: Result<(), IngestError>) {
            let label = if result.is_ok() {
                "ingest_ok"
            } else {
                "ingest_err"
            };
            self.events.write().unwrap().push(label);
        }

        fn record_publish(&self, _latency: Duration, result: Result<(), PublishError>) {
            let label = if result.is_ok() {
                "publish_ok"
            } else {
                "publish_err"
            };
            self.events.write().unwrap().push(label);
        }
    }

    // The recorder is process-global and other tests run alongside this one.
    #[tokio::test]
    async fn metrics_recorder_tracks_pipeline_outcome() {
        let metrics = Arc::new(CountingMetrics::default());
        set_pipeline_metrics(Some(metrics.clone()));

        let publisher = InMemoryPublisher::default();
        let cfg = PipelineConfig::default();

        submit_station_result(consistent_station(), &cfg, &publisher)
            .await
            .expect("accepted");

        let bad = RawStationResult {
            no_votes: 9,
            ..consistent_station()
        };
        let _ = submit_station_result(bad, &cfg, &publisher).await;

        publisher.set_fault(Fault::Transport("broker unreachable".into()));
        let _ = submit_station_result(consistent_station(), &cfg, &publisher).await;

        set_pipeline_metrics(None);

        let events = metrics.snapshot();
        assert!(events.contains(&"ingest_ok"));
        assert!(events.contains(&"publish_ok"));
        assert!(events.contains(&"ingest_err"));
        assert!(events.contains(&"publish_err"));
    }
}
