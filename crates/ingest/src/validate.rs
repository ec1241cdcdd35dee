//! Consistency checks for station submissions.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! ```text
//! RawStationResult
//!        │
//!        ▼
//! ┌──────────────────────────────────────┐
//! │ 0. Structural                        │
//! │    - ballot counts >= 0              │
//! │    - candidate count <= limit        │
//! │    - candidate votes >= 0            │
//! ├──────────────────────────────────────┤
//! │ 1. sum(candidate votes) == valid     │
//! ├──────────────────────────────────────┤
//! │ 2. valid + invalid + no_votes        │
//! │       == voters_count                │
//! └──────────────────────────────────────┘
//!        │
//!        ▼
//! CheckedCounts (all unsigned)
//! ```
//!
//! Nothing here allocates beyond the converted candidate list, touches I/O, or
//! keeps state, so the checks are safe to run from any number of tasks.
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{CandidateVote, RawStationResult};

/// Counts that passed every check, already converted to unsigned.
pub(crate) struct CheckedCounts {
    pub(crate) voters_count: u64,
    pub(crate) valid_ballots: u64,
    pub(crate) invalid_ballots: u64,
    pub(crate) no_votes: u64,
    pub(crate) candidate_votes: Vec<CandidateVote>,
}

/// Checks a decoded submission without building the canonical record.
///
/// Returns the first rejection in check order. Use [`ingest`](crate::ingest)
/// to also derive the key and obtain a [`StationResultPayload`](crate::StationResultPayload).
///
/// ```rust
/// use ingest::{validate, IngestConfig, IngestError, RawCandidateVote, RawStationResult};
///
/// let raw = RawStationResult {
///     idempotency_key: None,
///     district_id: 5,
///     station_id: 12,
///     voters_count: 104,
///     valid_ballots: 100,
///     invalid_ballots: 3,
///     no_votes: 2,
///     candidate_votes: vec![
///         RawCandidateVote { candidate_id: 1, votes: 60 },
///         RawCandidateVote { candidate_id: 2, votes: 40 },
///     ],
/// };
///
/// let err = validate(&raw, &IngestConfig::default()).unwrap_err();
/// assert!(matches!(err, IngestError::TurnoutMismatch { voters_count: 104, ballots_total: 105 }));
/// ```
pub fn validate(raw: &RawStationResult, cfg: &IngestConfig) -> Result<(), IngestError> {
    check_counts(raw, cfg).map(|_| ())
}

pub(crate) fn check_counts(
    raw: &RawStationResult,
    cfg: &IngestConfig,
) -> Result<CheckedCounts, IngestError> {
    let voters_count = non_negative("voters_count", raw.voters_count)?;
    let valid_ballots = non_negative("valid_ballots", raw.valid_ballots)?;
    let invalid_ballots = non_negative("invalid_ballots", raw.invalid_ballots)?;
    let no_votes = non_negative("no_votes", raw.no_votes)?;

    if let Some(limit) = cfg.max_candidates {
        if raw.candidate_votes.len() > limit {
            return Err(IngestError::TooManyCandidates {
                count: raw.candidate_votes.len(),
                limit,
            });
        }
    }

    let candidate_votes = raw
        .candidate_votes
        .iter()
        .map(|cv| {
            u64::try_from(cv.votes)
                .map(|votes| CandidateVote {
                    candidate_id: cv.candidate_id,
                    votes,
                })
                .map_err(|_| IngestError::NegativeCandidateVotes {
                    candidate_id: cv.candidate_id,
                    votes: cv.votes,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let candidate_total = candidate_votes
        .iter()
        .try_fold(0u64, |acc, cv| acc.checked_add(cv.votes))
        .ok_or(IngestError::CountOverflow("candidate vote total"))?;

    if candidate_total != valid_ballots {
        return Err(IngestError::CandidateSumMismatch {
            valid_ballots,
            candidate_total,
        });
    }

    let ballots_total = valid_ballots
        .checked_add(invalid_ballots)
        .and_then(|sum| sum.checked_add(no_votes))
        .ok_or(IngestError::CountOverflow("ballot total"))?;

    if ballots_total != voters_count {
        return Err(IngestError::TurnoutMismatch {
            voters_count,
            ballots_total,
        });
    }

    Ok(CheckedCounts {
        voters_count,
        valid_ballots,
        invalid_ballots,
        no_votes,
        candidate_votes,
    })
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, IngestError> {
    u64::try_from(value).map_err(|_| IngestError::NegativeCount { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawCandidateVote;

    fn votes(pairs: &[(i64, i64)]) -> Vec<RawCandidateVote> {
        pairs
            .iter()
            .map(|&(candidate_id, votes)| RawCandidateVote {
                candidate_id,
                votes,
            })
            .collect()
    }

    fn consistent() -> RawStationResult {
        RawStationResult {
            idempotency_key: None,
            district_id: 5,
            station_id: 12,
            voters_count: 105,
            valid_ballots: 100,
            invalid_ballots: 3,
            no_votes: 2,
            candidate_votes: votes(&[(1, 60), (2, 40)]),
        }
    }

    #[test]
    fn consistent_submission_passes() {
        assert!(validate(&consistent(), &IngestConfig::default()).is_ok());
    }

    #[test]
    fn candidate_sum_checked_before_turnout() {
        let raw = RawStationResult {
            voters_count: 1,
            candidate_votes: votes(&[(1, 60), (2, 30)]),
            ..consistent()
        };

        let err = validate(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(
            err,
            IngestError::CandidateSumMismatch {
                valid_ballots: 100,
                candidate_total: 90,
            }
        );
    }

    #[test]
    fn turnout_checked_with_correct_candidates() {
        let raw = RawStationResult {
            no_votes: 3,
            ..consistent()
        };

        let err = validate(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(
            err,
            IngestError::TurnoutMismatch {
                voters_count: 105,
                ballots_total: 106,
            }
        );
    }

    #[test]
    fn negative_offsetting_candidate_rejected() {
        // 130 - 30 == 100 would satisfy the sum check on its own.
        let raw = RawStationResult {
            candidate_votes: votes(&[(1, 130), (2, -30)]),
            ..consistent()
        };

        let err = validate(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(
            err,
            IngestError::NegativeCandidateVotes {
                candidate_id: 2,
                votes: -30,
            }
        );
    }

    #[test]
    fn negative_ballot_counts_rejected_in_field_order() {
        let raw = RawStationResult {
            voters_count: 95,
            invalid_ballots: -3,
            no_votes: -2,
            ..consistent()
        };

        let err = validate(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(
            err,
            IngestError::NegativeCount {
                field: "invalid_ballots",
                value: -3,
            }
        );
    }

    #[test]
    fn empty_candidates_only_valid_without_valid_ballots() {
        let empty_ok = RawStationResult {
            voters_count: 5,
            valid_ballots: 0,
            invalid_ballots: 3,
            no_votes: 2,
            candidate_votes: Vec::new(),
            ..consistent()
        };
        assert!(validate(&empty_ok, &IngestConfig::default()).is_ok());

        let empty_bad = RawStationResult {
            candidate_votes: Vec::new(),
            ..consistent()
        };
        assert!(matches!(
            validate(&empty_bad, &IngestConfig::default()),
            Err(IngestError::CandidateSumMismatch {
                candidate_total: 0,
                ..
            })
        ));
    }

    #[test]
    fn candidate_limit_enforced() {
        let cfg = IngestConfig {
            max_candidates: Some(1),
            ..Default::default()
        };

        let err = validate(&consistent(), &cfg).unwrap_err();
        assert_eq!(err, IngestError::TooManyCandidates { count: 2, limit: 1 });
    }

    #[test]
    fn overflowing_sums_are_rejected() {
        let raw = RawStationResult {
            voters_count: i64::MAX,
            valid_ballots: i64::MAX,
            invalid_ballots: i64::MAX,
            no_votes: i64::MAX,
            candidate_votes: votes(&[(1, i64::MAX)]),
            ..consistent()
        };

        let err = validate(&raw, &IngestConfig::default()).unwrap_err();
        assert_eq!(err, IngestError::CountOverflow("ballot total"));
    }
}
