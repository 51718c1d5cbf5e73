use serde::{Deserialize, Serialize};
use std::fmt;

use super::tiers::{tier_steps, MetricKind};
use super::ScoringError;

/// Raw competition attributes the score is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompetitionMetrics {
    pub prize_amount: f64,
    pub judge_count: i64,
    pub participant_count: i64,
    pub edition_number: i64, // 1 = inaugural
}

impl CompetitionMetrics {
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::PrizeAmount => self.prize_amount,
            MetricKind::JudgeCount => self.judge_count as f64,
            MetricKind::ParticipantCount => self.participant_count as f64,
            MetricKind::EditionNumber => self.edition_number as f64,
        }
    }
}

/// Letter grade derived from a competition's total steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    /// Thresholds are checked highest first.
    pub fn from_total(total_steps: u32) -> Self {
        match total_steps {
            t if t >= 70 => Grade::S,
            t if t >= 60 => Grade::A,
            t if t >= 50 => Grade::B,
            t if t >= 40 => Grade::C,
            _ => Grade::D,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricContribution {
    pub kind: MetricKind,
    pub steps: u32,
}

/// Normalized score of one competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionScore {
    pub prize_steps: u32,
    pub judge_steps: u32,
    pub participant_steps: u32,
    pub edition_steps: u32,
    pub total_steps: u32,
    pub grade: Grade,
}

impl CompetitionScore {
    /// Per-metric steps in display order.
    pub fn breakdown(&self) -> Vec<MetricContribution> {
        MetricKind::ALL
            .iter()
            .map(|kind| MetricContribution {
                kind: *kind,
                steps: self.steps_for(*kind),
            })
            .collect()
    }

    pub fn steps_for(&self, kind: MetricKind) -> u32 {
        match kind {
            MetricKind::PrizeAmount => self.prize_steps,
            MetricKind::JudgeCount => self.judge_steps,
            MetricKind::ParticipantCount => self.participant_steps,
            MetricKind::EditionNumber => self.edition_steps,
        }
    }
}

/// Score a competition from its metrics.
///
/// The first invalid metric aborts scoring; nothing is clamped.
pub fn aggregate(metrics: &CompetitionMetrics) -> Result<CompetitionScore, ScoringError> {
    let prize_steps = tier_steps(MetricKind::PrizeAmount, metrics.value(MetricKind::PrizeAmount))?;
    let judge_steps = tier_steps(MetricKind::JudgeCount, metrics.value(MetricKind::JudgeCount))?;
    let participant_steps = tier_steps(
        MetricKind::ParticipantCount,
        metrics.value(MetricKind::ParticipantCount),
    )?;
    let edition_steps = tier_steps(
        MetricKind::EditionNumber,
        metrics.value(MetricKind::EditionNumber),
    )?;

    let total_steps = prize_steps + judge_steps + participant_steps + edition_steps;

    Ok(CompetitionScore {
        prize_steps,
        judge_steps,
        participant_steps,
        edition_steps,
        total_steps,
        grade: Grade::from_total(total_steps),
    })
}
