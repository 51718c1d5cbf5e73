use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::assign::{assign_ranks, TieBreak};
use crate::error::EngineError;
use crate::store::{DancerId, RankingStore};

/// Owns every write to dancer totals and ranks.
///
/// Totals for one dancer are recomputed under that dancer's lock; the rank
/// pass holds a single pass lock so two passes never interleave their writes.
pub struct RankingAggregator<S> {
    store: Arc<S>,
    tie_break: TieBreak,
    rank_pass_attempts: u32,
    dancer_locks: Mutex<HashMap<DancerId, Arc<Mutex<()>>>>,
    rank_pass: Mutex<()>,
}

impl<S> RankingAggregator<S>
where
    S: RankingStore + 'static,
{
    pub fn new(store: Arc<S>, tie_break: TieBreak, rank_pass_attempts: u32) -> Self {
        Self {
            store,
            tie_break,
            rank_pass_attempts: rank_pass_attempts.max(1),
            dancer_locks: Mutex::new(HashMap::new()),
            rank_pass: Mutex::new(()),
        }
    }

    fn dancer_lock(&self, dancer_id: &DancerId) -> Arc<Mutex<()>> {
        let mut locks = self.dancer_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(dancer_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the dancer's lock entry once no other caller holds or waits on it.
    fn release_dancer_lock(&self, dancer_id: &DancerId, lock: Arc<Mutex<()>>) {
        let mut locks = self.dancer_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Held only by the map and by `lock`
        if Arc::strong_count(&lock) == 2 {
            locks.remove(dancer_id);
        }
    }

    /// Sum the dancer's counted rewards and store the total.
    ///
    /// Running it again without new rewards writes the same total.
    pub fn recompute_dancer(&self, dancer_id: &DancerId) -> Result<u64, EngineError> {
        let lock = self.dancer_lock(dancer_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store_dancer_total(dancer_id)
        };
        self.release_dancer_lock(dancer_id, lock);
        result
    }

    fn store_dancer_total(&self, dancer_id: &DancerId) -> Result<u64, EngineError> {
        let rewards = self.store.counted_rewards_for_dancer(dancer_id)?;
        let total: u64 = rewards.iter().map(|points| *points as u64).sum();
        self.store.save_dancer_total(dancer_id, total)?;

        tracing::debug!(dancer = %dancer_id, rewards = rewards.len(), total, "dancer total recomputed");
        Ok(total)
    }

    /// Re-rank the whole population from a fresh snapshot of totals.
    ///
    /// Ranks are written in one batch. If the batch fails, the pass starts
    /// over from a new snapshot, up to the configured number of attempts.
    pub fn recompute_all_ranks(&self) -> Result<Vec<(DancerId, u32)>, EngineError> {
        let _pass = self.rank_pass.lock().unwrap_or_else(PoisonError::into_inner);

        let mut attempt = 1;
        loop {
            match self.rank_pass_once() {
                Ok(ranks) => {
                    tracing::info!(dancers = ranks.len(), attempt, "rank pass complete");
                    return Ok(ranks);
                }
                Err(e) if attempt < self.rank_pass_attempts => {
                    tracing::warn!(attempt, error = %e, "rank pass failed, retrying from fresh snapshot");
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "rank pass failed, ranks left unchanged");
                    return Err(EngineError::RankPassExhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    fn rank_pass_once(&self) -> Result<Vec<(DancerId, u32)>, crate::store::StoreError> {
        let totals = self.store.dancer_totals()?;
        let ranks = assign_ranks(&totals, self.tie_break);
        self.store.save_dancer_ranks(&ranks)?;
        Ok(ranks)
    }
}
