//! Configuration types for the ingest step.
//!
//! [`IngestConfig`] is small on purpose: the arithmetic rules are fixed and
//! not configurable. The only knob is an optional cap on the number of
//! candidate entries one submission may carry.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for ingest behavior.
///
/// Serializes to and from JSON, TOML or YAML:
///
/// ```json
/// {
///   "version": 1,
///   "max_candidates": 64
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Version of the ingest configuration, bumped on behavior changes.
    ///
    /// Default: `1`
    pub version: u32,

    /// Upper bound on `candidate_votes.len()`.
    ///
    /// Submissions above the bound fail with
    /// [`IngestError::TooManyCandidates`](crate::IngestError::TooManyCandidates)
    /// before any sum is computed.
    ///
    /// Default: `None` (unlimited)
    pub max_candidates: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            max_candidates: None,
        }
    }
}

/// Errors that can occur when validating an [`IngestConfig`].
///
/// These surface at start-up, never at request time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// `max_candidates` was set to zero, which would reject every station
    /// with at least one valid ballot.
    #[error("max_candidates must be greater than zero")]
    ZeroCandidateLimit,
}

impl IngestConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// ```rust
    /// use ingest::{ConfigError, IngestConfig};
    ///
    /// let bad = IngestConfig {
    ///     max_candidates: Some(0),
    ///     ..Default::default()
    /// };
    /// assert_eq!(bad.validate(), Err(ConfigError::ZeroCandidateLimit));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_candidates == Some(0) {
            return Err(ConfigError::ZeroCandidateLimit);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.version, 1);
        assert!(cfg.max_candidates.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: IngestConfig =
            serde_json::from_str(r#"{"max_candidates": 12}"#).expect("config decodes");
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.max_candidates, Some(12));
    }
}
