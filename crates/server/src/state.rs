use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use publish::StationPublisher;
use std::sync::Arc;
use tally::PipelineConfig;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Stream connection, created once and shared by every request
    pub publisher: Arc<dyn StationPublisher>,

    /// Prometheus handle when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state, building the publisher from configuration
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let publisher = config
            .pipeline
            .publisher
            .build()
            .map_err(|err| ServerError::Config(err.to_string()))?;

        Ok(Self::with_publisher(config, publisher))
    }

    /// Create server state around an existing publisher
    pub fn with_publisher(config: ServerConfig, publisher: Arc<dyn StationPublisher>) -> Self {
        let metrics = if config.metrics_enabled {
            telemetry::install_prometheus()
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            publisher,
            metrics,
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.config.pipeline
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use publish::{DeliveryMode, PublisherBackend};

    #[test]
    fn test_new_builds_configured_publisher() {
        let mut config = ServerConfig {
            metrics_enabled: false,
            ..Default::default()
        };
        config.pipeline.publisher.backend = PublisherBackend::InMemory;
        config.pipeline.publisher.delivery = DeliveryMode::FireAndForget;

        let state = ServerState::new(config).expect("in-memory state builds");
        assert_eq!(state.publisher.delivery_mode(), DeliveryMode::FireAndForget);
        assert!(state.metrics.is_none());
    }

    #[test]
    fn test_new_reports_publisher_config_errors() {
        let mut config = ServerConfig {
            metrics_enabled: false,
            ..Default::default()
        };
        config.pipeline.publisher.backend = PublisherBackend::InMemory;
        config.pipeline.publisher.max_records = 0;

        let err = ServerState::new(config).err().expect("zero retention is refused");
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("max_records"));
    }
}
