//! YAML configuration for the tally pipeline.
//!
//! One file carries the ingest rules, the publisher connection and the
//! publish deadline, so the server and any batch tooling load identical
//! settings.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "bangkok-general-election"
//!
//! ingest:
//!   version: 1
//!   max_candidates: 64
//!
//! publisher:
//!   backend: kafka
//!   brokers: "kafka-1:9092,kafka-2:9092"
//!   topic: station-results
//!   delivery: sync_ack
//!   acks: all
//!   enable_idempotence: true
//!
//! publish_timeout_ms: 5000
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use ingest::IngestConfig;
use publish::PublisherConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Deadline applied to every publish.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.ingest
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("ingest: {err}")))?;
        self.publisher
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("publisher: {err}")))?;

        if self.publish_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "publish_timeout_ms must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            ingest: IngestConfig::default(),
            publisher: PublisherConfig::default(),
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_publish_timeout_ms() -> u64 {
    5_000
}
