//! Partitioned in-process stream.
//!
//! Behaves like a single-broker topic: keys hash to a fixed partition, every
//! partition keeps its own offset sequence, and appends to one partition are
//! totally ordered. Faults can be switched on at runtime to exercise the
//! failure paths of whatever sits on top.
//!
//! Only the most recent `max_records` messages are retained; offsets keep
//! counting past evicted records.
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    DeliveryMode, PublishError, PublishReceipt, PublisherStats, StationPublisher, StatsCounters,
    StreamMessage,
};

/// Failure to inject into subsequent sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fault {
    #[default]
    None,
    /// Refuse the message outright, as an unreachable broker would.
    Transport(String),
    /// Never complete the send.
    Stall,
    /// Accept the message locally, then lose it before acknowledgment.
    FailAfterHandoff(String),
}

/// A message that made it onto the in-memory log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: String,
    pub value: Vec<u8>,
}

/// Records kept by [`InMemoryPublisher::new`] before the oldest are evicted.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

#[derive(Default)]
struct Log {
    records: VecDeque<RecordedMessage>,
    next_offsets: HashMap<(String, i32), i64>,
}

pub struct InMemoryPublisher {
    partitions: u32,
    max_records: usize,
    delivery: DeliveryMode,
    log: Mutex<Log>,
    fault: Mutex<Fault>,
    stats: StatsCounters,
    closed: AtomicBool,
}

impl InMemoryPublisher {
    /// Creates an empty log with `partitions` partitions per topic.
    ///
    /// A partition count of zero is treated as one. At most
    /// [`DEFAULT_MAX_RECORDS`] messages are retained.
    pub fn new(partitions: u32, delivery: DeliveryMode) -> Self {
        Self {
            partitions: partitions.max(1),
            max_records: DEFAULT_MAX_RECORDS,
            delivery,
            log: Mutex::new(Log::default()),
            fault: Mutex::new(Fault::None),
            stats: StatsCounters::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Caps the number of retained messages. Zero is treated as one.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Partition a key is routed to.
    pub fn partition_for(&self, key: &str) -> i32 {
        (xxh3_64(key.as_bytes()) % u64::from(self.partitions)) as i32
    }

    pub fn set_fault(&self, fault: Fault) {
        *lock(&self.fault) = fault;
    }

    /// Every retained message in append order.
    pub fn messages(&self) -> Vec<RecordedMessage> {
        lock(&self.log).records.iter().cloned().collect()
    }

    /// Recorded messages carrying `key`, in offset order.
    pub fn messages_for_key(&self, key: &str) -> Vec<RecordedMessage> {
        lock(&self.log)
            .records
            .iter()
            .filter(|record| record.key == key)
            .cloned()
            .collect()
    }

    /// Recorded messages on one partition of a topic, in offset order.
    pub fn partition_log(&self, topic: &str, partition: i32) -> Vec<RecordedMessage> {
        lock(&self.log)
            .records
            .iter()
            .filter(|record| record.topic == topic && record.partition == partition)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.log).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn append(&self, message: StreamMessage) -> RecordedMessage {
        let partition = self.partition_for(&message.key);
        let mut log = lock(&self.log);
        let next = log
            .next_offsets
            .entry((message.topic.clone(), partition))
            .or_insert(0);
        let offset = *next;
        *next += 1;

        let record = RecordedMessage {
            topic: message.topic,
            partition,
            offset,
            key: message.key,
            value: message.value,
        };
        if log.records.len() == self.max_records {
            log.records.pop_front();
        }
        log.records.push_back(record.clone());
        record
    }
}

impl Default for InMemoryPublisher {
    fn default() -> Self {
        Self::new(1, DeliveryMode::SyncAck)
    }
}

// A panic while holding the lock leaves the log itself intact.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl StationPublisher for InMemoryPublisher {
    async fn send(
        &self,
        message: StreamMessage,
        _deadline: Duration,
    ) -> Result<PublishReceipt, PublishError> {
        if self.is_closed() {
            self.stats.record_failed();
            return Err(PublishError::Closed);
        }

        let fault = lock(&self.fault).clone();
        match fault {
            Fault::None => {}
            Fault::Stall => {
                std::future::pending::<()>().await;
            }
            Fault::Transport(reason) => {
                self.stats.record_failed();
                return Err(PublishError::Transport(reason));
            }
            Fault::FailAfterHandoff(reason) => {
                return match self.delivery {
                    DeliveryMode::SyncAck => {
                        self.stats.record_failed();
                        Err(PublishError::Transport(reason))
                    }
                    DeliveryMode::FireAndForget => {
                        self.stats.record_enqueued();
                        self.stats.record_late_failure();
                        error!(
                            topic = %message.topic,
                            key = %message.key,
                            error = %reason,
                            "publish_late_failure"
                        );
                        Ok(PublishReceipt {
                            topic: message.topic,
                            key: message.key,
                            delivery: DeliveryMode::FireAndForget,
                            partition: None,
                            offset: None,
                        })
                    }
                };
            }
        }

        let record = self.append(message);
        self.stats.record_enqueued();
        self.stats.record_acknowledged();

        let (partition, offset) = match self.delivery {
            DeliveryMode::SyncAck => (Some(record.partition), Some(record.offset)),
            DeliveryMode::FireAndForget => (None, None),
        };
        Ok(PublishReceipt {
            topic: record.topic,
            key: record.key,
            delivery: self.delivery,
            partition,
            offset,
        })
    }

    fn delivery_mode(&self) -> DeliveryMode {
        self.delivery
    }

    fn stats(&self) -> PublisherStats {
        self.stats.snapshot()
    }

    fn record_deadline_exceeded(&self) {
        self.stats.record_failed();
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
