use crate::scoring::ScoringError;
use crate::store::{CompetitionId, StoreError};

/// Failure of an engine operation.
///
/// Every variant is recoverable by fixing the input or retrying; none leaves
/// stored ranks half-written.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid scoring input: {0}")]
    Scoring(#[from] ScoringError),
    #[error("competition {competition_id} cannot be scored: {source}")]
    InvalidCompetition {
        competition_id: CompetitionId,
        #[source]
        source: ScoringError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("rank pass failed after {attempts} attempts: {source}")]
    RankPassExhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },
}
