use std::time::{Duration, Instant};

use tally::{
    DeliveryMode, Fault, InMemoryPublisher, IngestConfig, IngestError, PipelineConfig,
    PipelineError, PublishError, RawCandidateVote, RawStationResult, StationPublisher,
    submit_station_result,
};

fn base_record() -> RawStationResult {
    RawStationResult {
        idempotency_key: None,
        district_id: 3,
        station_id: 44,
        voters_count: 50,
        valid_ballots: 45,
        invalid_ballots: 4,
        no_votes: 1,
        candidate_votes: vec![
            RawCandidateVote {
                candidate_id: 10,
                votes: 25,
            },
            RawCandidateVote {
                candidate_id: 11,
                votes: 20,
            },
        ],
    }
}

#[tokio::test]
async fn negative_candidate_votes_cannot_balance_the_sum() {
    let publisher = InMemoryPublisher::default();
    let raw = RawStationResult {
        candidate_votes: vec![
            RawCandidateVote {
                candidate_id: 10,
                votes: 55,
            },
            RawCandidateVote {
                candidate_id: 11,
                votes: -10,
            },
        ],
        ..base_record()
    };

    let err = submit_station_result(raw, &PipelineConfig::default(), &publisher)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Rejected(IngestError::NegativeCandidateVotes {
            candidate_id: 11,
            votes: -10
        })
    ));
    assert!(publisher.is_empty());
}

#[tokio::test]
async fn negative_ballot_count_is_rejected() {
    let publisher = InMemoryPublisher::default();
    let raw = RawStationResult {
        voters_count: -1,
        ..base_record()
    };

    let err = submit_station_result(raw, &PipelineConfig::default(), &publisher)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Rejected(IngestError::NegativeCount {
            field: "voters_count",
            ..
        })
    ));
}

#[tokio::test]
async fn candidate_limit_from_config_applies() {
    let publisher = InMemoryPublisher::default();
    let cfg = PipelineConfig {
        ingest: IngestConfig {
            max_candidates: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };

    let err = submit_station_result(base_record(), &cfg, &publisher)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PipelineError::Rejected(IngestError::TooManyCandidates { count: 2, limit: 1 })
    );
}

#[tokio::test]
async fn stalled_stream_returns_within_deadline() {
    let publisher = InMemoryPublisher::default();
    publisher.set_fault(Fault::Stall);
    let cfg = PipelineConfig {
        publish_timeout_ms: 50,
        ..Default::default()
    };

    let start = Instant::now();
    let err = submit_station_result(base_record(), &cfg, &publisher)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PipelineError::Publish(PublishError::DeadlineExceeded(Duration::from_millis(50)))
    );
    assert!(err.is_retryable());
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(publisher.stats().failed, 1);
}

#[tokio::test]
async fn fire_and_forget_late_failure_is_invisible_to_caller() {
    let publisher = InMemoryPublisher::new(4, DeliveryMode::FireAndForget);
    publisher.set_fault(Fault::FailAfterHandoff("leader not available".into()));

    let receipt = submit_station_result(base_record(), &PipelineConfig::default(), &publisher)
        .await
        .expect("fire-and-forget reports success");

    assert!(!receipt.publish.is_acknowledged());
    assert!(publisher.is_empty());
    assert_eq!(publisher.stats().late_failures, 1);
}

#[tokio::test]
async fn sync_ack_surfaces_the_same_failure() {
    let publisher = InMemoryPublisher::new(4, DeliveryMode::SyncAck);
    publisher.set_fault(Fault::FailAfterHandoff("leader not available".into()));

    let err = submit_station_result(base_record(), &PipelineConfig::default(), &publisher)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Publish(PublishError::Transport(_))
    ));
    assert_eq!(publisher.stats().late_failures, 0);
    assert_eq!(publisher.stats().failed, 1);
}

#[tokio::test]
async fn closed_publisher_fails_submissions() {
    let publisher = InMemoryPublisher::default();
    publisher.close().await.expect("close");

    let err = submit_station_result(base_record(), &PipelineConfig::default(), &publisher)
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::Publish(PublishError::Closed));
}
