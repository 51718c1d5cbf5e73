pub mod competition;
pub mod reward;
pub mod tiers;

pub use competition::{aggregate, CompetitionMetrics, CompetitionScore, Grade, MetricContribution};
pub use reward::{participation_reward, reward, reward_for_rank, Rank, RewardPolicy};
pub use tiers::{tier_steps, validate_metric, MetricKind, TOTAL_STEPS_RANGE};

/// Rejected scoring input. Values are never clamped into range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("{kind} must be at least {minimum}, got {value}")]
    BelowMinimum {
        kind: MetricKind,
        value: f64,
        minimum: f64,
    },
    #[error("{kind} must be a whole number, got {value}")]
    NotInteger { kind: MetricKind, value: f64 },
    #[error("{kind} must be a finite number")]
    NotFinite { kind: MetricKind },
    #[error("rank must be a positive integer, got {0}")]
    InvalidRank(i64),
    #[error("competition total must be between {min} and {max} steps, got {value}")]
    TotalOutOfRange { value: u32, min: u32, max: u32 },
}
