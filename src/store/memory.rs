use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::types::{CompetitionId, DancerId, DancerTotal, Placement, RankingDocument};
use super::{RankingStore, StoreError};
use crate::scoring::CompetitionMetrics;

/// In-process store. Writes go through a single lock, so a rejected rank
/// batch never leaves a half-written population behind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: RwLock<RankingDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: RankingDocument) -> Self {
        Self {
            doc: RwLock::new(doc),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<RankingDocument, StoreError> {
        Ok(self.read()?.clone())
    }

    /// Apply a data-entry change (registering dancers, recording entries, ...).
    ///
    /// The change is built on a copy and swapped in only if `f` succeeds.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut RankingDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut current = self.write()?;
        let mut next = current.clone();
        let value = f(&mut next)?;
        *current = next;
        Ok(value)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RankingDocument>, StoreError> {
        self.doc
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RankingDocument>, StoreError> {
        self.doc
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl RankingStore for MemoryStore {
    fn competition_metrics(&self, competition_id: &CompetitionId) -> Result<CompetitionMetrics, StoreError> {
        self.read()?.competition_metrics(competition_id)
    }

    fn placements(&self, competition_id: &CompetitionId) -> Result<Vec<Placement>, StoreError> {
        self.read()?.placements(competition_id)
    }

    fn unranked_entrants(&self, competition_id: &CompetitionId) -> Result<Vec<DancerId>, StoreError> {
        self.read()?.unranked_entrants(competition_id)
    }

    fn issued_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
    ) -> Result<Option<u32>, StoreError> {
        self.read()?.issued_reward(competition_id, dancer_id)
    }

    fn counted_rewards_for_dancer(&self, dancer_id: &DancerId) -> Result<Vec<u32>, StoreError> {
        self.read()?.counted_rewards_for_dancer(dancer_id)
    }

    fn dancer_totals(&self) -> Result<Vec<DancerTotal>, StoreError> {
        Ok(self.read()?.dancer_totals())
    }

    fn save_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
        points: u32,
    ) -> Result<Option<u32>, StoreError> {
        self.write()?.save_reward(competition_id, dancer_id, points)
    }

    fn save_dancer_total(&self, dancer_id: &DancerId, total: u64) -> Result<(), StoreError> {
        self.write()?.save_dancer_total(dancer_id, total)
    }

    fn save_dancer_ranks(&self, ranks: &[(DancerId, u32)]) -> Result<(), StoreError> {
        self.write()?.save_dancer_ranks(ranks)
    }
}
