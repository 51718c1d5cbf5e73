use serde::{Deserialize, Serialize};
use std::fmt;

use super::ScoringError;

/// Points awarded per tier, lowest tier first.
pub const TIER_STEPS: [u32; 4] = [5, 10, 15, 20];

/// Every competition total lies in this range: four metrics, 5 to 20 steps each.
pub const TOTAL_STEPS_RANGE: std::ops::RangeInclusive<u32> = 20..=80;

/// One of the four raw competition attributes that feed the competition score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    PrizeAmount,
    JudgeCount,
    ParticipantCount,
    EditionNumber,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::PrizeAmount,
        MetricKind::JudgeCount,
        MetricKind::ParticipantCount,
        MetricKind::EditionNumber,
    ];

    /// Inclusive upper bounds of the first three tiers. Anything above the
    /// last bound lands in the top tier.
    pub fn bounds(&self) -> [f64; 3] {
        match self {
            MetricKind::PrizeAmount => [500_000.0, 1_000_000.0, 3_000_000.0],
            MetricKind::JudgeCount => [1.0, 3.0, 5.0],
            MetricKind::ParticipantCount => [50.0, 100.0, 300.0],
            MetricKind::EditionNumber => [1.0, 3.0, 5.0],
        }
    }

    /// Smallest accepted value.
    pub fn minimum(&self) -> f64 {
        match self {
            MetricKind::EditionNumber => 1.0,
            _ => 0.0,
        }
    }

    /// Whether the metric is a count (fractional values are rejected).
    pub fn is_integral(&self) -> bool {
        !matches!(self, MetricKind::PrizeAmount)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::PrizeAmount => "Prize",
            MetricKind::JudgeCount => "Judges",
            MetricKind::ParticipantCount => "Participants",
            MetricKind::EditionNumber => "Edition",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::PrizeAmount => "prize_amount",
            MetricKind::JudgeCount => "judge_count",
            MetricKind::ParticipantCount => "participant_count",
            MetricKind::EditionNumber => "edition_number",
        };
        f.write_str(name)
    }
}

/// Validate a raw metric value without scoring it.
pub fn validate_metric(kind: MetricKind, value: f64) -> Result<(), ScoringError> {
    if !value.is_finite() {
        return Err(ScoringError::NotFinite { kind });
    }
    if value < kind.minimum() {
        return Err(ScoringError::BelowMinimum {
            kind,
            value,
            minimum: kind.minimum(),
        });
    }
    if kind.is_integral() && value.fract() != 0.0 {
        return Err(ScoringError::NotInteger { kind, value });
    }
    Ok(())
}

/// Map one raw metric to its tier steps (5, 10, 15 or 20).
///
/// Tier bounds are inclusive on the lower tier: a prize of exactly 1,000,000
/// scores 10. Out-of-domain values are rejected, never clamped.
pub fn tier_steps(kind: MetricKind, value: f64) -> Result<u32, ScoringError> {
    validate_metric(kind, value)?;

    let tier = kind
        .bounds()
        .iter()
        .position(|bound| value <= *bound)
        .unwrap_or(TIER_STEPS.len() - 1);

    Ok(TIER_STEPS[tier])
}
