//! Error types produced by the ingest crate.
//!
//! Every variant is a validation rejection: the submission was decoded fine
//! but its numbers do not hold together. Rejections are deterministic, so
//! resubmitting the same data fails the same way; the caller has to correct
//! the tally first.
//!
//! # Error Categories
//!
//! | Error | Check | Description |
//! |-------|-------|-------------|
//! | [`NegativeCount`](IngestError::NegativeCount) | structural | A ballot count is below zero |
//! | [`NegativeCandidateVotes`](IngestError::NegativeCandidateVotes) | structural | A candidate tally is below zero |
//! | [`TooManyCandidates`](IngestError::TooManyCandidates) | policy | More candidate entries than configured |
//! | [`CountOverflow`](IngestError::CountOverflow) | structural | A sum does not fit in 64 bits |
//! | [`CandidateSumMismatch`](IngestError::CandidateSumMismatch) | arithmetic | Candidate votes do not add up to valid ballots |
//! | [`TurnoutMismatch`](IngestError::TurnoutMismatch) | arithmetic | Ballot categories do not add up to voters |
//!
//! The `Display` text of each variant is safe to return to the submitter
//! verbatim.
//!
//! ```rust
//! use ingest::IngestError;
//!
//! let err = IngestError::CandidateSumMismatch {
//!     valid_ballots: 100,
//!     candidate_total: 90,
//! };
//! assert!(err.to_string().contains("100"));
//! assert!(err.to_string().contains("90"));
//! assert_eq!(err.kind(), "candidate_sum_mismatch");
//! ```
use thiserror::Error;

/// Reasons a decoded station submission is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// One of the station-level ballot counts is negative.
    #[error("{field} must not be negative (got {value})")]
    NegativeCount {
        /// Wire name of the offending field.
        field: &'static str,
        value: i64,
    },

    /// A candidate's vote count is negative.
    ///
    /// Checked before any sum so that a negative entry cannot offset a
    /// positive one and slip through the arithmetic checks.
    #[error("votes for candidate {candidate_id} must not be negative (got {votes})")]
    NegativeCandidateVotes { candidate_id: i64, votes: i64 },

    /// The submission lists more candidates than the configured limit.
    #[error("submission lists {count} candidates, limit is {limit}")]
    TooManyCandidates { count: usize, limit: usize },

    /// A sum of counts overflowed `u64`.
    #[error("{0} overflows")]
    CountOverflow(&'static str),

    /// Candidate votes do not add up to the number of valid ballots.
    #[error(
        "valid_ballots ({valid_ballots}) does not match the candidate vote total ({candidate_total})"
    )]
    CandidateSumMismatch {
        valid_ballots: u64,
        candidate_total: u64,
    },

    /// Valid, invalid and no-vote ballots do not add up to the turnout.
    #[error(
        "voters_count ({voters_count}) does not match valid + invalid + no-vote ballots ({ballots_total})"
    )]
    TurnoutMismatch {
        voters_count: u64,
        ballots_total: u64,
    },
}

impl IngestError {
    /// Stable snake_case label, used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::NegativeCount { .. } => "negative_count",
            IngestError::NegativeCandidateVotes { .. } => "negative_candidate_votes",
            IngestError::TooManyCandidates { .. } => "too_many_candidates",
            IngestError::CountOverflow(_) => "count_overflow",
            IngestError::CandidateSumMismatch { .. } => "candidate_sum_mismatch",
            IngestError::TurnoutMismatch { .. } => "turnout_mismatch",
        }
    }
}
