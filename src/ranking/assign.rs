use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::store::{DancerId, DancerTotal};

/// How dancers with equal totals are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The dancer registered first takes the better rank; dancer id settles
    /// identical registration times.
    #[default]
    EarliestRegistered,
    /// Lower dancer id takes the better rank.
    DancerId,
}

impl TieBreak {
    fn compare(&self, a: &DancerTotal, b: &DancerTotal) -> Ordering {
        match self {
            TieBreak::EarliestRegistered => a
                .registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.dancer_id.cmp(&b.dancer_id)),
            TieBreak::DancerId => a.dancer_id.cmp(&b.dancer_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TieBreak::EarliestRegistered => "earliest_registered",
            TieBreak::DancerId => "dancer_id",
        }
    }
}

/// Order dancers by total descending and number them from 1.
///
/// The result is a permutation of 1..=N: ties are broken by `tie_break`,
/// never left to sort stability.
pub fn assign_ranks(totals: &[DancerTotal], tie_break: TieBreak) -> Vec<(DancerId, u32)> {
    let mut ordered: Vec<&DancerTotal> = totals.iter().collect();
    ordered.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| tie_break.compare(a, b))
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(ahead, total)| (total.dancer_id.clone(), ahead as u32 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashSet;

    fn total(id: &str, points: u64, registered_at: DateTime<Utc>) -> DancerTotal {
        DancerTotal {
            dancer_id: id.into(),
            total_points: points,
            registered_at,
        }
    }

    fn rank_of(ranks: &[(DancerId, u32)], id: &str) -> u32 {
        ranks
            .iter()
            .find(|(d, _)| d.0 == id)
            .map(|(_, r)| *r)
            .unwrap()
    }

    #[test]
    fn test_ties_go_to_earliest_registered() {
        let now = Utc::now();
        let totals = vec![
            total("late", 68, now),
            total("third", 40, now - Duration::days(30)),
            total("early", 68, now - Duration::days(10)),
        ];

        let ranks = assign_ranks(&totals, TieBreak::EarliestRegistered);
        assert_eq!(rank_of(&ranks, "early"), 1);
        assert_eq!(rank_of(&ranks, "late"), 2);
        assert_eq!(rank_of(&ranks, "third"), 3);
    }

    #[test]
    fn test_ties_by_dancer_id() {
        let now = Utc::now();
        let totals = vec![
            total("b", 68, now - Duration::days(10)),
            total("a", 68, now),
            total("c", 40, now),
        ];

        let ranks = assign_ranks(&totals, TieBreak::DancerId);
        assert_eq!(rank_of(&ranks, "a"), 1);
        assert_eq!(rank_of(&ranks, "b"), 2);
        assert_eq!(rank_of(&ranks, "c"), 3);
    }

    #[test]
    fn test_same_registration_time_falls_back_to_id() {
        let now = Utc::now();
        let totals = vec![total("zed", 10, now), total("amy", 10, now)];
        let ranks = assign_ranks(&totals, TieBreak::EarliestRegistered);
        assert_eq!(rank_of(&ranks, "amy"), 1);
        assert_eq!(rank_of(&ranks, "zed"), 2);
    }

    #[test]
    fn test_ranks_are_a_permutation() {
        let now = Utc::now();
        let totals: Vec<_> = (0..200)
            .map(|i| total(&format!("dancer-{:03}", i), (i % 7) as u64 * 10, now))
            .collect();

        let ranks = assign_ranks(&totals, TieBreak::EarliestRegistered);
        assert_eq!(ranks.len(), 200);
        let unique: HashSet<u32> = ranks.iter().map(|(_, r)| *r).collect();
        assert_eq!(unique.len(), 200);
        assert_eq!(*unique.iter().min().unwrap(), 1);
        assert_eq!(*unique.iter().max().unwrap(), 200);
    }

    #[test]
    fn test_higher_total_always_ranks_better() {
        let now = Utc::now();
        let totals = vec![
            total("a", 5, now - Duration::days(100)),
            total("b", 90, now),
            total("c", 45, now - Duration::days(1)),
        ];
        let ranks = assign_ranks(&totals, TieBreak::EarliestRegistered);
        assert_eq!(ranks[0].0, DancerId::from("b"));
        assert_eq!(ranks[1].0, DancerId::from("c"));
        assert_eq!(ranks[2].0, DancerId::from("a"));
    }

    #[test]
    fn test_empty_population() {
        assert!(assign_ranks(&[], TieBreak::DancerId).is_empty());
    }
}
