//! Kafka backend over rdkafka's `FutureProducer`.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{error, info};

use crate::{
    DeliveryMode, PublishError, PublishReceipt, PublisherConfig, PublisherStats, StationPublisher,
    StatsCounters, StreamMessage,
};

/// Publishes station records to Kafka.
///
/// Cloning the inner producer is cheap, so the publisher itself is meant to be
/// wrapped in an `Arc` and shared.
pub struct KafkaPublisher {
    producer: FutureProducer,
    delivery: DeliveryMode,
    close_timeout: Duration,
    stats: Arc<StatsCounters>,
    closed: AtomicBool,
}

impl KafkaPublisher {
    /// Builds a producer from `cfg`.
    ///
    /// No broker connection is made here; librdkafka connects lazily on the
    /// first send.
    pub fn new(cfg: &PublisherConfig) -> Result<Self, PublishError> {
        cfg.validate()?;

        let producer: FutureProducer = client_config(cfg)
            .create()
            .map_err(|err| PublishError::Client(err.to_string()))?;

        info!(
            brokers = %cfg.brokers,
            client_id = %cfg.client_id,
            delivery = cfg.delivery.as_str(),
            acks = %cfg.acks,
            "kafka_producer_created"
        );

        Ok(Self {
            producer,
            delivery: cfg.delivery,
            close_timeout: cfg.close_timeout(),
            stats: Arc::new(StatsCounters::default()),
            closed: AtomicBool::new(false),
        })
    }
}

pub(crate) fn client_config(cfg: &PublisherConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &cfg.brokers)
        .set("client.id", &cfg.client_id)
        .set("acks", &cfg.acks)
        .set("enable.idempotence", cfg.enable_idempotence.to_string())
        .set("message.timeout.ms", cfg.message_timeout_ms.to_string())
        .set("linger.ms", cfg.linger_ms.to_string());

    for (key, value) in &cfg.client_overrides {
        client.set(key, value);
    }
    client
}

/// Splits client errors into ones a resend may fix and ones it never will.
fn delivery_error(err: KafkaError) -> PublishError {
    let permanent = matches!(
        err.rdkafka_error_code(),
        Some(
            RDKafkaErrorCode::MessageSizeTooLarge
                | RDKafkaErrorCode::MessageBatchTooLarge
                | RDKafkaErrorCode::InvalidMessage
                | RDKafkaErrorCode::InvalidMessageSize
                | RDKafkaErrorCode::InvalidRecord
                | RDKafkaErrorCode::InvalidTopic
                | RDKafkaErrorCode::InvalidRequiredAcks
                | RDKafkaErrorCode::TopicAuthorizationFailed
                | RDKafkaErrorCode::ClusterAuthorizationFailed
                | RDKafkaErrorCode::SaslAuthenticationFailed
                | RDKafkaErrorCode::UnsupportedVersion
                | RDKafkaErrorCode::UnsupportedForMessageFormat
        )
    );

    if permanent {
        PublishError::Refused(err.to_string())
    } else {
        PublishError::Transport(err.to_string())
    }
}

#[async_trait]
impl StationPublisher for KafkaPublisher {
    async fn send(
        &self,
        message: StreamMessage,
        deadline: Duration,
    ) -> Result<PublishReceipt, PublishError> {
        if self.closed.load(Ordering::Acquire) {
            self.stats.record_failed();
            return Err(PublishError::Closed);
        }

        let record = FutureRecord::to(&message.topic)
            .key(message.key.as_bytes())
            .payload(&message.value);

        match self.delivery {
            DeliveryMode::SyncAck => {
                match self.producer.send(record, Timeout::After(deadline)).await {
                    Ok((partition, offset)) => {
                        self.stats.record_enqueued();
                        self.stats.record_acknowledged();
                        Ok(PublishReceipt {
                            topic: message.topic,
                            key: message.key,
                            delivery: DeliveryMode::SyncAck,
                            partition: Some(partition),
                            offset: Some(offset),
                        })
                    }
                    Err((err, _message)) => {
                        self.stats.record_failed();
                        Err(delivery_error(err))
                    }
                }
            }
            DeliveryMode::FireAndForget => {
                let delivery = self.producer.send_result(record).map_err(|(err, _record)| {
                    self.stats.record_failed();
                    delivery_error(err)
                })?;
                self.stats.record_enqueued();

                let stats = Arc::clone(&self.stats);
                let topic = message.topic.clone();
                let key = message.key.clone();
                tokio::spawn(async move {
                    match delivery.await {
                        Ok(Ok(_)) => stats.record_acknowledged(),
                        Ok(Err((err, _message))) => {
                            stats.record_late_failure();
                            error!(topic = %topic, key = %key, error = %err, "publish_late_failure");
                        }
                        Err(_canceled) => {
                            stats.record_late_failure();
                            error!(
                                topic = %topic,
                                key = %key,
                                error = "delivery report dropped",
                                "publish_late_failure"
                            );
                        }
                    }
                });

                Ok(PublishReceipt {
                    topic: message.topic,
                    key: message.key,
                    delivery: DeliveryMode::FireAndForget,
                    partition: None,
                    offset: None,
                })
            }
        }
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
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let producer = self.producer.clone();
        let timeout = self.close_timeout;
        let flushed = tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|err| PublishError::Transport(err.to_string()))?;

        match flushed {
            Ok(()) => {
                info!(stats = ?self.stats.snapshot(), "kafka_producer_closed");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "kafka_producer_flush_failed");
                Err(PublishError::Transport(err.to_string()))
            }
        }
    }
}
