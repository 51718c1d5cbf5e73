use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::StoreError;
use crate::scoring::{CompetitionMetrics, Rank};

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DancerId(pub String);

impl fmt::Display for DancerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for DancerId {
    fn from(value: &str) -> Self {
        DancerId(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitionId(pub String);

impl fmt::Display for CompetitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for CompetitionId {
    fn from(value: &str) -> Self {
        CompetitionId(value.to_string())
    }
}

/// Whether an entry counts toward the dancer's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Signed up but did not compete.
    Registered,
    /// Actually competed; rewards count.
    Competed,
}

impl EntryStatus {
    pub fn is_counted(&self) -> bool {
        matches!(self, EntryStatus::Competed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DancerRecord {
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub total_points: u64,
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionRecord {
    pub name: Option<String>,
    pub metrics: CompetitionMetrics,
}

/// One dancer's participation in one competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub competition_id: CompetitionId,
    pub dancer_id: DancerId,
    pub rank: Option<Rank>,
    pub status: EntryStatus,
    #[serde(default)]
    pub points_awarded: Option<u32>,
}

/// A dancer's finishing position in one competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub dancer_id: DancerId,
    pub rank: Rank,
}

/// Snapshot row used by the rank pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DancerTotal {
    pub dancer_id: DancerId,
    pub total_points: u64,
    pub registered_at: DateTime<Utc>,
}

/// Complete persisted state of the ranking store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingDocument {
    pub version: u32,
    #[serde(default)]
    pub dancers: BTreeMap<DancerId, DancerRecord>,
    #[serde(default)]
    pub competitions: BTreeMap<CompetitionId, CompetitionRecord>,
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
}

impl Default for RankingDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingDocument {
    pub fn new() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            dancers: BTreeMap::new(),
            competitions: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    /// Add a dancer. Re-registering an existing id only updates the name.
    pub fn register_dancer(
        &mut self,
        dancer_id: DancerId,
        name: Option<String>,
        registered_at: DateTime<Utc>,
    ) {
        self.dancers
            .entry(dancer_id)
            .and_modify(|d| {
                if name.is_some() {
                    d.name = name.clone();
                }
            })
            .or_insert(DancerRecord {
                name,
                registered_at,
                total_points: 0,
                rank: None,
            });
    }

    /// Create or update a competition. Changing metrics does not touch rewards
    /// already issued for it.
    pub fn set_competition(
        &mut self,
        competition_id: CompetitionId,
        name: Option<String>,
        metrics: CompetitionMetrics,
    ) {
        match self.competitions.get_mut(&competition_id) {
            Some(existing) => {
                existing.metrics = metrics;
                if name.is_some() {
                    existing.name = name;
                }
            }
            None => {
                self.competitions
                    .insert(competition_id, CompetitionRecord { name, metrics });
            }
        }
    }

    /// Record or replace a dancer's entry in a competition.
    ///
    /// Ranks must be unique within a competition, and only dancers who
    /// competed can hold one.
    pub fn record_entry(
        &mut self,
        competition_id: CompetitionId,
        dancer_id: DancerId,
        rank: Option<Rank>,
        status: EntryStatus,
    ) -> Result<(), StoreError> {
        if !self.competitions.contains_key(&competition_id) {
            return Err(StoreError::CompetitionNotFound(competition_id));
        }
        if !self.dancers.contains_key(&dancer_id) {
            return Err(StoreError::DancerNotFound(dancer_id));
        }
        if let (Some(rank), EntryStatus::Registered) = (rank, status) {
            return Err(StoreError::InvalidEntry(format!(
                "{} is only registered for {} and cannot hold rank {}",
                dancer_id, competition_id, rank
            )));
        }
        if let Some(rank) = rank {
            let taken = self.entries.iter().any(|e| {
                e.competition_id == competition_id && e.dancer_id != dancer_id && e.rank == Some(rank)
            });
            if taken {
                return Err(StoreError::InvalidEntry(format!(
                    "rank {} in {} is already taken",
                    rank, competition_id
                )));
            }
        }

        let existing = self
            .entries
            .iter()
            .position(|e| e.competition_id == competition_id && e.dancer_id == dancer_id);

        match existing {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.rank = rank;
                entry.status = status;
            }
            None => self.entries.push(EntryRecord {
                competition_id,
                dancer_id,
                rank,
                status,
                points_awarded: None,
            }),
        }
        Ok(())
    }

    pub fn competition_metrics(
        &self,
        competition_id: &CompetitionId,
    ) -> Result<CompetitionMetrics, StoreError> {
        self.competitions
            .get(competition_id)
            .map(|c| c.metrics)
            .ok_or_else(|| StoreError::CompetitionNotFound(competition_id.clone()))
    }

    fn competition_entries<'a>(
        &'a self,
        competition_id: &'a CompetitionId,
    ) -> Result<impl Iterator<Item = &'a EntryRecord> + 'a, StoreError> {
        if !self.competitions.contains_key(competition_id) {
            return Err(StoreError::CompetitionNotFound(competition_id.clone()));
        }
        Ok(self
            .entries
            .iter()
            .filter(move |e| &e.competition_id == competition_id && e.status.is_counted()))
    }

    /// Counted placements, best rank first.
    pub fn placements(&self, competition_id: &CompetitionId) -> Result<Vec<Placement>, StoreError> {
        let mut placements: Vec<Placement> = self
            .competition_entries(competition_id)?
            .filter_map(|e| {
                e.rank.map(|rank| Placement {
                    dancer_id: e.dancer_id.clone(),
                    rank,
                })
            })
            .collect();
        placements.sort_by_key(|p| p.rank);
        Ok(placements)
    }

    pub fn unranked_entrants(&self, competition_id: &CompetitionId) -> Result<Vec<DancerId>, StoreError> {
        Ok(self
            .competition_entries(competition_id)?
            .filter(|e| e.rank.is_none())
            .map(|e| e.dancer_id.clone())
            .collect())
    }

    pub fn issued_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
    ) -> Result<Option<u32>, StoreError> {
        Ok(self
            .find_entry(competition_id, dancer_id)?
            .and_then(|e| e.points_awarded))
    }

    fn find_entry(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
    ) -> Result<Option<&EntryRecord>, StoreError> {
        if !self.competitions.contains_key(competition_id) {
            return Err(StoreError::CompetitionNotFound(competition_id.clone()));
        }
        Ok(self
            .entries
            .iter()
            .find(|e| &e.competition_id == competition_id && &e.dancer_id == dancer_id))
    }

    pub fn counted_rewards_for_dancer(&self, dancer_id: &DancerId) -> Result<Vec<u32>, StoreError> {
        if !self.dancers.contains_key(dancer_id) {
            return Err(StoreError::DancerNotFound(dancer_id.clone()));
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| &e.dancer_id == dancer_id && e.status.is_counted())
            .filter_map(|e| e.points_awarded)
            .collect())
    }

    pub fn dancer_totals(&self) -> Vec<DancerTotal> {
        self.dancers
            .iter()
            .map(|(id, d)| DancerTotal {
                dancer_id: id.clone(),
                total_points: d.total_points,
                registered_at: d.registered_at,
            })
            .collect()
    }

    /// Store a reward, returning the value it replaced.
    pub fn save_reward(
        &mut self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
        points: u32,
    ) -> Result<Option<u32>, StoreError> {
        if !self.competitions.contains_key(competition_id) {
            return Err(StoreError::CompetitionNotFound(competition_id.clone()));
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.competition_id == competition_id && &e.dancer_id == dancer_id)
            .ok_or_else(|| {
                StoreError::InvalidEntry(format!("{} has no entry in {}", dancer_id, competition_id))
            })?;
        Ok(entry.points_awarded.replace(points))
    }

    pub fn save_dancer_total(&mut self, dancer_id: &DancerId, total: u64) -> Result<(), StoreError> {
        let dancer = self
            .dancers
            .get_mut(dancer_id)
            .ok_or_else(|| StoreError::DancerNotFound(dancer_id.clone()))?;
        dancer.total_points = total;
        Ok(())
    }

    /// Replace every dancer's rank at once.
    ///
    /// The batch must name each dancer exactly once. On error nothing changes.
    pub fn save_dancer_ranks(&mut self, ranks: &[(DancerId, u32)]) -> Result<(), StoreError> {
        if ranks.len() != self.dancers.len() {
            return Err(StoreError::PartialRankBatch {
                expected: self.dancers.len(),
                received: ranks.len(),
            });
        }

        let mut next: BTreeMap<&DancerId, u32> = BTreeMap::new();
        for (dancer_id, rank) in ranks {
            if !self.dancers.contains_key(dancer_id) {
                return Err(StoreError::DancerNotFound(dancer_id.clone()));
            }
            if next.insert(dancer_id, *rank).is_some() {
                return Err(StoreError::InvalidEntry(format!(
                    "{} appears twice in the rank batch",
                    dancer_id
                )));
            }
        }

        for (dancer_id, dancer) in self.dancers.iter_mut() {
            dancer.rank = next.get(dancer_id).copied();
        }
        Ok(())
    }

    /// Dancers ordered by stored rank; unranked dancers last.
    pub fn leaderboard(&self) -> Vec<(&DancerId, &DancerRecord)> {
        let mut rows: Vec<_> = self.dancers.iter().collect();
        rows.sort_by(|a, b| match (a.1.rank, b.1.rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(b.0),
        });
        rows
    }
}
