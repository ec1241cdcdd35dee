//! Tally Ingest Layer
//!
//! This is where a polling station's tally enters the system. We take the
//! decoded submission, check that its numbers hold together, derive the
//! station's idempotency key, and hand back the canonical record that gets
//! published.
//!
//! ## What we do here
//!
//! - **Reject forgeries early** - Negative counts are refused before any sum
//!   is computed, so a negative entry can't cancel out a positive one
//! - **Check the arithmetic** - Candidate votes must add up to valid ballots,
//!   and the ballot categories must add up to the turnout
//! - **Derive the key** - `district_<d>_station_<s>`, same station = same key,
//!   every time. Whatever key the caller sent is thrown away.
//! - **Log everything** - Structured logs via tracing for every accept and reject.
//!
//! ## Main entry point
//!
//! Call [`ingest`] with a [`RawStationResult`] and [`IngestConfig`], get back a
//! [`StationResultPayload`]. Errors are typed and their text is safe to show
//! to the submitter.
//!
//! ## Example
//!
//! ```
//! use ingest::{ingest, IngestConfig, RawCandidateVote, RawStationResult};
//!
//! let raw = RawStationResult {
//!     idempotency_key: Some("whatever-the-client-sent".into()),
//!     district_id: 5,
//!     station_id: 12,
//!     voters_count: 105,
//!     valid_ballots: 100,
//!     invalid_ballots: 3,
//!     no_votes: 2,
//!     candidate_votes: vec![
//!         RawCandidateVote { candidate_id: 1, votes: 60 },
//!         RawCandidateVote { candidate_id: 2, votes: 40 },
//!     ],
//! };
//!
//! let payload = ingest(raw, &IngestConfig::default()).unwrap();
//! assert_eq!(payload.idempotency_key, "district_5_station_12");
//! ```
use std::time::Instant;

use tracing::{info, warn, Level};

mod config;
mod error;
mod key;
mod types;
mod validate;

use crate::validate::check_counts;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::error::IngestError;
pub use crate::key::derive_key;
pub use crate::types::{CandidateVote, RawCandidateVote, RawStationResult, StationResultPayload};
pub use crate::validate::validate;

/// Ingest a decoded submission: validates it, derives its key, and returns the
/// canonical record.
///
/// On error nothing has been mutated or sent anywhere.
pub fn ingest(
    raw: RawStationResult,
    cfg: &IngestConfig,
) -> Result<StationResultPayload, IngestError> {
    let start = Instant::now();

    let span = tracing::span!(
        Level::INFO,
        "ingest.ingest",
        district_id = raw.district_id,
        station_id = raw.station_id
    );
    let _guard = span.enter();

    match ingest_inner(raw, cfg) {
        Ok(payload) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                idempotency_key = %payload.idempotency_key,
                voters_count = payload.voters_count,
                candidates = payload.candidate_votes.len(),
                elapsed_micros,
                "ingest_success"
            );
            Ok(payload)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(
                error = %err,
                kind = err.kind(),
                elapsed_micros,
                "ingest_failure"
            );
            Err(err)
        }
    }
}

fn ingest_inner(
    raw: RawStationResult,
    cfg: &IngestConfig,
) -> Result<StationResultPayload, IngestError> {
    let counts = check_counts(&raw, cfg)?;

    Ok(StationResultPayload {
        idempotency_key: derive_key(raw.district_id, raw.station_id),
        district_id: raw.district_id,
        station_id: raw.station_id,
        voters_count: counts.voters_count,
        valid_ballots: counts.valid_ballots,
        invalid_ballots: counts.invalid_ballots,
        no_votes: counts.no_votes,
        candidate_votes: counts.candidate_votes,
    })
}
