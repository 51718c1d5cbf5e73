use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ScoringError, TOTAL_STEPS_RANGE};

/// Finishing position within one competition. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Rank(u32);

impl Rank {
    pub fn new(value: i64) -> Result<Self, ScoringError> {
        if value < 1 || value > u32::MAX as i64 {
            return Err(ScoringError::InvalidRank(value));
        }
        Ok(Rank(value as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Rank {
    type Error = ScoringError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rank::new(value)
    }
}

impl From<Rank> for u32 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which placement percentage table pays out rewards.
///
/// The two tables are deliberately kept separate; pick one in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicy {
    /// 1st 100%, 2nd 70%, 3rd 50%, everyone else nothing.
    #[default]
    TopThree,
    /// 1st-5th 100/70/50/30/20%, 6th and below 10%, unranked entrants 10%.
    Extended,
}

impl RewardPolicy {
    /// Share of the competition total earned at `rank`, in percent.
    pub fn percentage(&self, rank: Rank) -> u32 {
        match (self, rank.get()) {
            (_, 1) => 100,
            (_, 2) => 70,
            (_, 3) => 50,
            (RewardPolicy::TopThree, _) => 0,
            (RewardPolicy::Extended, 4) => 30,
            (RewardPolicy::Extended, 5) => 20,
            (RewardPolicy::Extended, _) => 10,
        }
    }

    /// Share earned by an entrant who competed without placing, in percent.
    pub fn participation_percentage(&self) -> u32 {
        match self {
            RewardPolicy::TopThree => 0,
            RewardPolicy::Extended => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RewardPolicy::TopThree => "top_three",
            RewardPolicy::Extended => "extended",
        }
    }
}

/// `round(total_steps * percent / 100)` with halves rounded up.
fn share(total_steps: u32, percent: u32) -> u32 {
    let scaled = total_steps as u64 * percent as u64;
    ((scaled + 50) / 100) as u32
}

/// Points a placed dancer earns from a competition worth `total_steps`.
pub fn reward(policy: RewardPolicy, total_steps: u32, rank: Rank) -> u32 {
    share(total_steps, policy.percentage(rank))
}

/// Points an unranked entrant earns for competing.
pub fn participation_reward(policy: RewardPolicy, total_steps: u32) -> u32 {
    share(total_steps, policy.participation_percentage())
}

/// Validate a raw total and rank, then compute the reward in one step.
pub fn reward_for_rank(policy: RewardPolicy, total_steps: u32, rank: i64) -> Result<u32, ScoringError> {
    if !TOTAL_STEPS_RANGE.contains(&total_steps) {
        return Err(ScoringError::TotalOutOfRange {
            value: total_steps,
            min: *TOTAL_STEPS_RANGE.start(),
            max: *TOTAL_STEPS_RANGE.end(),
        });
    }
    Ok(reward(policy, total_steps, Rank::new(rank)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(n: i64) -> Rank {
        Rank::new(n).unwrap()
    }

    #[test]
    fn test_top_three_rewards() {
        let policy = RewardPolicy::TopThree;
        assert_eq!(reward(policy, 45, rank(1)), 45);
        assert_eq!(reward(policy, 45, rank(2)), 32); // 31.5 rounds up
        assert_eq!(reward(policy, 45, rank(3)), 23); // 22.5 rounds up
        assert_eq!(reward(policy, 45, rank(4)), 0);
        assert_eq!(reward(policy, 45, rank(40)), 0);
        assert_eq!(participation_reward(policy, 45), 0);
    }

    #[test]
    fn test_extended_rewards() {
        let policy = RewardPolicy::Extended;
        assert_eq!(reward(policy, 45, rank(1)), 45);
        assert_eq!(reward(policy, 45, rank(2)), 32);
        assert_eq!(reward(policy, 45, rank(3)), 23);
        assert_eq!(reward(policy, 45, rank(4)), 14); // 13.5
        assert_eq!(reward(policy, 45, rank(5)), 9);
        assert_eq!(reward(policy, 45, rank(6)), 5); // 4.5
        assert_eq!(reward(policy, 45, rank(60)), 5);
        assert_eq!(participation_reward(policy, 45), 5);
    }

    #[test]
    fn test_rounding_below_half_goes_down() {
        // 41 * 0.7 = 28.7, 41 * 0.5 = 20.5, 43 * 0.7 = 30.1
        assert_eq!(reward(RewardPolicy::TopThree, 41, rank(2)), 29);
        assert_eq!(reward(RewardPolicy::TopThree, 41, rank(3)), 21);
        assert_eq!(reward(RewardPolicy::TopThree, 43, rank(2)), 30);
    }

    #[test]
    fn test_reward_non_increasing_in_rank() {
        for policy in [RewardPolicy::TopThree, RewardPolicy::Extended] {
            for total in 20..=80 {
                let mut previous = u32::MAX;
                for r in 1..=12 {
                    let points = reward(policy, total, rank(r));
                    assert!(points <= previous, "{} total {} rank {}", policy.name(), total, r);
                    previous = points;
                }
            }
        }
    }

    #[test]
    fn test_reward_is_idempotent() {
        let first = reward(RewardPolicy::Extended, 67, rank(4));
        let second = reward(RewardPolicy::Extended, 67, rank(4));
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_rank_rejected() {
        assert!(matches!(Rank::new(0), Err(ScoringError::InvalidRank(0))));
        assert!(matches!(Rank::new(-2), Err(ScoringError::InvalidRank(-2))));
        assert!(reward_for_rank(RewardPolicy::TopThree, 45, 0).is_err());
        assert_eq!(reward_for_rank(RewardPolicy::TopThree, 45, 2).unwrap(), 32);
    }

    #[test]
    fn test_total_outside_competition_range_rejected() {
        for total in [0, 19, 81, 500] {
            assert!(matches!(
                reward_for_rank(RewardPolicy::TopThree, total, 1),
                Err(ScoringError::TotalOutOfRange { value, min: 20, max: 80 }) if value == total
            ));
        }
        assert_eq!(reward_for_rank(RewardPolicy::TopThree, 20, 1).unwrap(), 20);
        assert_eq!(reward_for_rank(RewardPolicy::TopThree, 80, 3).unwrap(), 40);
    }

    #[test]
    fn test_rank_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Rank>("0").is_err());
        assert_eq!(serde_json::from_str::<Rank>("3").unwrap().get(), 3);
    }

    #[test]
    fn test_policy_yaml_names() {
        let policy: RewardPolicy = serde_saphyr::from_str("extended").unwrap();
        assert_eq!(policy, RewardPolicy::Extended);
        let policy: RewardPolicy = serde_saphyr::from_str("top_three").unwrap();
        assert_eq!(policy, RewardPolicy::TopThree);
    }
}
