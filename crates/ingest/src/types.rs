//! Core data model types for the ingest crate.
//!
//! Two shapes exist for a station submission:
//!
//! - [`RawStationResult`] is what the HTTP layer decodes. Nothing about it is
//!   trusted: counts are signed so a negative forgery can be reported with a
//!   reason, and any caller-supplied `idempotency_key` is carried only so it
//!   can be discarded.
//! - [`StationResultPayload`] is the canonical record. It is only produced by
//!   [`ingest`](crate::ingest), its counts are unsigned, and it is the exact
//!   value serialized onto the result stream.
//!
//! # Type Hierarchy
//!
//! ```text
//! RawStationResult
//! ├── idempotency_key: Option<String>   (ignored)
//! ├── district_id: i64
//! ├── station_id: i64                   (wire: "polling_station_id")
//! ├── voters_count / valid_ballots / invalid_ballots / no_votes: i64
//! └── candidate_votes: Vec<RawCandidateVote>
//!
//!         ↓ ingest()
//!
//! StationResultPayload
//! ├── idempotency_key: String           (derive_key(district_id, station_id))
//! ├── district_id: i64
//! ├── station_id: i64
//! ├── voters_count / valid_ballots / invalid_ballots / no_votes: u64
//! └── candidate_votes: Vec<CandidateVote>
//! ```
//!
//! # Example
//!
//! ```rust
//! use ingest::RawStationResult;
//!
//! let body = r#"{
//!     "district_id": 5,
//!     "polling_station_id": 12,
//!     "voters_count": 105,
//!     "valid_ballots": 100,
//!     "invalid_ballots": 3,
//!     "no_votes": 2,
//!     "candidate_votes": [
//!         {"candidate_id": 1, "votes": 60},
//!         {"candidate_id": 2, "votes": 40}
//!     ]
//! }"#;
//!
//! let raw: RawStationResult = serde_json::from_str(body).unwrap();
//! assert_eq!(raw.station_id, 12);
//! assert!(raw.idempotency_key.is_none());
//! ```
use serde::{Deserialize, Serialize};

/// One candidate's tally as submitted by a station, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCandidateVote {
    pub candidate_id: i64,
    pub votes: i64,
}

/// A station submission exactly as decoded from the request body.
///
/// Every integer field is required; a missing field is a decode failure and
/// never reaches validation. `candidate_votes` may be omitted, which reads as
/// an empty list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawStationResult {
    /// Caller-supplied key. Always replaced by the server-derived one.
    #[serde(default)]
    pub idempotency_key: Option<String>,

    pub district_id: i64,

    #[serde(rename = "polling_station_id", alias = "station_id")]
    pub station_id: i64,

    /// Total people who voted at the station.
    pub voters_count: i64,

    pub valid_ballots: i64,

    pub invalid_ballots: i64,

    pub no_votes: i64,

    #[serde(default)]
    pub candidate_votes: Vec<RawCandidateVote>,
}

/// One candidate's validated tally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CandidateVote {
    pub candidate_id: i64,
    pub votes: u64,
}

/// The canonical, validated station result that flows to the stream.
///
/// Invariants held by every value built through [`ingest`](crate::ingest):
///
/// - `candidate_votes` sums to `valid_ballots`
/// - `valid_ballots + invalid_ballots + no_votes == voters_count`
/// - `idempotency_key == derive_key(district_id, station_id)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StationResultPayload {
    pub idempotency_key: String,
    pub district_id: i64,
    #[serde(rename = "polling_station_id")]
    pub station_id: i64,
    pub voters_count: u64,
    pub valid_ballots: u64,
    pub invalid_ballots: u64,
    pub no_votes: u64,
    pub candidate_votes: Vec<CandidateVote>,
}

impl StationResultPayload {
    /// The partition key this record must be published under.
    pub fn partition_key(&self) -> &str {
        &self.idempotency_key
    }

    /// Sum of all candidate votes.
    pub fn candidate_total(&self) -> u64 {
        self.candidate_votes.iter().map(|cv| cv.votes).sum()
    }
}
