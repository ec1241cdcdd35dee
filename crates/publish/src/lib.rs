//! Tally Publish Layer
//!
//! Hands validated station records to a partitioned, durable stream. Every
//! message is keyed by the station's idempotency key, so all submissions for
//! one station land on the same partition and are read back in publish order.
//!
//! ## Backends
//!
//! - [`KafkaPublisher`] - rdkafka `FutureProducer` (feature `kafka`, on by default)
//! - [`InMemoryPublisher`] - partitioned in-process log for tests and local runs
//!
//! Both sit behind the object-safe [`StationPublisher`] trait, and a single
//! `Arc<dyn StationPublisher>` is meant to be shared by every request.
//!
//! ## Delivery modes
//!
//! [`DeliveryMode::SyncAck`] returns after the stream acknowledges the
//! message. [`DeliveryMode::FireAndForget`] returns once the message is
//! buffered; a failure after that point never reaches the caller and only
//! shows up in [`PublisherStats::late_failures`].
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use publish::{publish, DeliveryMode, InMemoryPublisher};
//!
//! # tokio_test_block(async {
//! let publisher = InMemoryPublisher::new(4, DeliveryMode::SyncAck);
//! let receipt = publish(
//!     &publisher,
//!     "station-results",
//!     "district_5_station_12",
//!     &serde_json::json!({ "voters_count": 105 }),
//!     Duration::from_secs(1),
//! )
//! .await
//! .unwrap();
//! assert!(receipt.is_acknowledged());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
//! # }
//! ```
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

mod config;
mod error;
#[cfg(feature = "kafka")]
mod kafka;
mod memory;

pub use crate::config::{ConfigError, DeliveryMode, PublisherBackend, PublisherConfig};
pub use crate::error::PublishError;
#[cfg(feature = "kafka")]
pub use crate::kafka::KafkaPublisher;
pub use crate::memory::{Fault, InMemoryPublisher, RecordedMessage, DEFAULT_MAX_RECORDS};

/// A single keyed message ready for the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub topic: String,
    /// Partition key. Messages sharing it stay ordered.
    pub key: String,
    /// Encoded payload bytes.
    pub value: Vec<u8>,
}

impl StreamMessage {
    /// Encodes `payload` as JSON and wraps it with its routing data.
    pub fn json<T: Serialize + ?Sized>(
        topic: &str,
        key: &str,
        payload: &T,
    ) -> Result<Self, PublishError> {
        Ok(Self {
            topic: topic.to_string(),
            key: key.to_string(),
            value: serde_json::to_vec(payload)?,
        })
    }
}

/// What the publisher knows about a message it accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub topic: String,
    pub key: String,
    pub delivery: DeliveryMode,
    /// Set once the stream has acknowledged the message, which only happens
    /// before `publish` returns in sync-ack mode.
    pub partition: Option<i32>,
    pub offset: Option<i64>,
}

impl PublishReceipt {
    pub fn is_acknowledged(&self) -> bool {
        self.offset.is_some()
    }
}

/// Snapshot of a publisher's delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublisherStats {
    /// Messages handed to the stream client.
    pub enqueued: u64,
    /// Messages the stream confirmed.
    pub acknowledged: u64,
    /// Publishes that returned an error to the caller.
    pub failed: u64,
    /// Fire-and-forget messages that failed after `publish` returned success.
    pub late_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    enqueued: AtomicU64,
    acknowledged: AtomicU64,
    failed: AtomicU64,
    late_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acknowledged(&self) {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_late_failure(&self) {
        self.late_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            late_failures: self.late_failures.load(Ordering::Relaxed),
        }
    }
}

/// A connection to the partitioned stream.
///
/// Implementations must tolerate any number of concurrent `send` calls
/// without external locking.
#[async_trait]
pub trait StationPublisher: Send + Sync {
    /// Hands one message to the stream.
    ///
    /// `deadline` bounds how long the client may wait for local buffer space
    /// or acknowledgment. Callers should prefer [`publish`], which also
    /// enforces the deadline from the outside.
    async fn send(
        &self,
        message: StreamMessage,
        deadline: Duration,
    ) -> Result<PublishReceipt, PublishError>;

    fn delivery_mode(&self) -> DeliveryMode;

    fn stats(&self) -> PublisherStats;

    /// Called by [`publish`] when a send was abandoned at its deadline, so
    /// the failure shows up in [`stats`](Self::stats).
    fn record_deadline_exceeded(&self) {}

    /// Flushes buffered messages and refuses further sends.
    async fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Encodes `payload` as JSON and publishes it under `partition_key`.
///
/// The whole operation is bounded by `deadline`; on expiry the attempt is
/// abandoned and [`PublishError::DeadlineExceeded`] is returned.
pub async fn publish<P, T>(
    publisher: &P,
    topic: &str,
    partition_key: &str,
    payload: &T,
    deadline: Duration,
) -> Result<PublishReceipt, PublishError>
where
    P: StationPublisher + ?Sized,
    T: Serialize + ?Sized,
{
    let start = Instant::now();
    let message = StreamMessage::json(topic, partition_key, payload)?;
    let bytes = message.value.len();

    match tokio::time::timeout(deadline, publisher.send(message, deadline)).await {
        Ok(Ok(receipt)) => {
            debug!(
                topic,
                key = partition_key,
                bytes,
                partition = receipt.partition,
                offset = receipt.offset,
                delivery = receipt.delivery.as_str(),
                elapsed_micros = start.elapsed().as_micros(),
                "publish_success"
            );
            Ok(receipt)
        }
        Ok(Err(err)) => {
            warn!(
                topic,
                key = partition_key,
                error = %err,
                kind = err.kind(),
                elapsed_micros = start.elapsed().as_micros(),
                "publish_failure"
            );
            Err(err)
        }
        Err(_) => {
            publisher.record_deadline_exceeded();
            let err = PublishError::DeadlineExceeded(deadline);
            warn!(
                topic,
                key = partition_key,
                error = %err,
                kind = err.kind(),
                elapsed_micros = start.elapsed().as_micros(),
                "publish_failure"
            );
            Err(err)
        }
    }
}
