//! Publisher configuration.
//!
//! ```yaml
//! backend: kafka
//! brokers: "kafka-1:9092,kafka-2:9092"
//! topic: station-results
//! client_id: tally-ingest
//! delivery: sync_ack
//! acks: all
//! enable_idempotence: true
//! message_timeout_ms: 5000
//! linger_ms: 5
//! close_timeout_ms: 10000
//! max_records: 10000
//! client_overrides:
//!   compression.type: lz4
//! ```
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::{InMemoryPublisher, DEFAULT_MAX_RECORDS};
use crate::{PublishError, StationPublisher};

/// Longest topic name Kafka accepts.
const MAX_TOPIC_LEN: usize = 249;

/// When `publish` reports success.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Return only after the stream has acknowledged the message.
    #[default]
    SyncAck,
    /// Return once the message is buffered locally. Failures after that point
    /// are logged and counted as late failures, never returned.
    FireAndForget,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::SyncAck => "sync_ack",
            DeliveryMode::FireAndForget => "fire_and_forget",
        }
    }
}

/// Which publisher implementation to build.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublisherBackend {
    /// A Kafka producer. Requires the `kafka` feature.
    #[default]
    Kafka,
    /// A partitioned in-process log. Useful for tests and local runs.
    InMemory,
}

/// Settings for the stream publisher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublisherConfig {
    pub backend: PublisherBackend,

    /// Comma-separated `host:port` bootstrap list.
    pub brokers: String,

    /// Destination topic for station results.
    ///
    /// Default: `station-results`
    pub topic: String,

    pub client_id: String,

    pub delivery: DeliveryMode,

    /// Broker acknowledgment level (`all`, `1`, `0`).
    pub acks: String,

    /// Enables the producer's idempotent mode. Requires `acks = all`.
    pub enable_idempotence: bool,

    /// Upper bound the client spends delivering one message, retries included.
    pub message_timeout_ms: u64,

    pub linger_ms: u64,

    /// How long `close` waits for buffered messages to drain.
    pub close_timeout_ms: u64,

    /// Partition count for the in-memory backend. Ignored by Kafka, where the
    /// topic owns its partitioning.
    pub partitions: u32,

    /// Messages the in-memory backend retains before evicting the oldest.
    ///
    /// Default: `10000`
    pub max_records: usize,

    /// Extra client properties passed through verbatim. Applied last, so
    /// they win over the typed fields above.
    pub client_overrides: BTreeMap<String, String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            backend: PublisherBackend::Kafka,
            brokers: "localhost:9092".to_string(),
            topic: "station-results".to_string(),
            client_id: "tally-ingest".to_string(),
            delivery: DeliveryMode::SyncAck,
            acks: "all".to_string(),
            enable_idempotence: true,
            message_timeout_ms: 5_000,
            linger_ms: 5,
            close_timeout_ms: 10_000,
            partitions: 8,
            max_records: DEFAULT_MAX_RECORDS,
            client_overrides: BTreeMap::new(),
        }
    }
}

/// Errors that can occur when validating a [`PublisherConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("brokers must not be empty")]
    EmptyBrokers,

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("topic '{0}' is longer than 249 characters or contains characters other than [a-zA-Z0-9._-]")]
    InvalidTopic(String),

    #[error("enable_idempotence requires acks = all (got '{0}')")]
    IdempotenceRequiresAcksAll(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("backend '{0}' is not compiled into this build")]
    BackendUnavailable(&'static str),
}

impl PublisherConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// ```rust
    /// use publish::{ConfigError, PublisherConfig};
    ///
    /// let cfg = PublisherConfig {
    ///     acks: "1".into(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(cfg.validate(), Err(ConfigError::IdempotenceRequiresAcksAll("1".into())));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == PublisherBackend::Kafka && self.brokers.trim().is_empty() {
            return Err(ConfigError::EmptyBrokers);
        }

        if self.topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.topic.len() > MAX_TOPIC_LEN
            || !self
                .topic
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(ConfigError::InvalidTopic(self.topic.clone()));
        }

        if self.enable_idempotence && !matches!(self.acks.as_str(), "all" | "-1") {
            return Err(ConfigError::IdempotenceRequiresAcksAll(self.acks.clone()));
        }

        if self.message_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("message_timeout_ms"));
        }
        if self.backend == PublisherBackend::InMemory {
            if self.partitions == 0 {
                return Err(ConfigError::ZeroValue("partitions"));
            }
            if self.max_records == 0 {
                return Err(ConfigError::ZeroValue("max_records"));
            }
        }

        Ok(())
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Builds the configured publisher.
    ///
    /// The returned handle is meant to be created once at start-up and shared
    /// by every request.
    pub fn build(&self) -> Result<Arc<dyn StationPublisher>, PublishError> {
        self.validate()?;

        match self.backend {
            PublisherBackend::InMemory => Ok(Arc::new(
                InMemoryPublisher::new(self.partitions, self.delivery)
                    .with_max_records(self.max_records),
            )),
            PublisherBackend::Kafka => {
                #[cfg(feature = "kafka")]
                {
                    Ok(Arc::new(crate::kafka::KafkaPublisher::new(self)?))
                }
                #[cfg(not(feature = "kafka"))]
                {
                    Err(ConfigError::BackendUnavailable("kafka").into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PublisherConfig::default();
        assert_eq!(cfg.topic, "station-results");
        assert_eq!(cfg.delivery, DeliveryMode::SyncAck);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn delivery_mode_uses_snake_case() {
        let cfg: PublisherConfig =
            serde_json::from_str(r#"{"delivery": "fire_and_forget", "backend": "in_memory"}"#)
                .expect("config decodes");
        assert_eq!(cfg.delivery, DeliveryMode::FireAndForget);
        assert_eq!(cfg.backend, PublisherBackend::InMemory);
        assert_eq!(cfg.brokers, "localhost:9092");
    }

    #[test]
    fn rejects_bad_topics() {
        let empty = PublisherConfig {
            topic: String::new(),
            ..Default::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::EmptyTopic));

        let spaced = PublisherConfig {
            topic: "station results".into(),
            ..Default::default()
        };
        assert!(matches!(
            spaced.validate(),
            Err(ConfigError::InvalidTopic(_))
        ));
    }

    #[test]
    fn rejects_blank_brokers_for_kafka_only() {
        let kafka = PublisherConfig {
            brokers: "  ".into(),
            ..Default::default()
        };
        assert_eq!(kafka.validate(), Err(ConfigError::EmptyBrokers));

        let memory = PublisherConfig {
            backend: PublisherBackend::InMemory,
            ..kafka
        };
        assert!(memory.validate().is_ok());
    }

    #[test]
    fn idempotence_accepts_numeric_all() {
        let cfg = PublisherConfig {
            acks: "-1".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());

        let relaxed = PublisherConfig {
            acks: "1".into(),
            enable_idempotence: false,
            ..Default::default()
        };
        assert!(relaxed.validate().is_ok());
    }

    #[test]
    fn builds_in_memory_backend() {
        let cfg = PublisherConfig {
            backend: PublisherBackend::InMemory,
            partitions: 4,
            delivery: DeliveryMode::FireAndForget,
            ..Default::default()
        };
        let publisher = cfg.build().expect("in-memory publisher builds");
        assert_eq!(publisher.delivery_mode(), DeliveryMode::FireAndForget);
    }

    #[test]
    fn in_memory_retention_must_be_positive() {
        let cfg = PublisherConfig {
            backend: PublisherBackend::InMemory,
            max_records: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroValue("max_records")));
        assert_eq!(PublisherConfig::default().max_records, DEFAULT_MAX_RECORDS);
    }
}
