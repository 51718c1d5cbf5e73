pub mod file;
pub mod memory;
pub mod types;

pub use file::{get_store_path, load_document, save_document, FileStore};
pub use memory::MemoryStore;
pub use types::{
    CompetitionId, CompetitionRecord, DancerId, DancerRecord, DancerTotal, EntryRecord,
    EntryStatus, Placement, RankingDocument,
};

use crate::scoring::CompetitionMetrics;

/// Read/write boundary the ranking engine runs against.
///
/// Implementations must make `save_dancer_ranks` all-or-nothing: either every
/// rank in the batch is stored, or none is.
pub trait RankingStore: Send + Sync {
    fn competition_metrics(&self, competition_id: &CompetitionId) -> Result<CompetitionMetrics, StoreError>;

    /// Ranked placements of dancers who competed, best rank first.
    fn placements(&self, competition_id: &CompetitionId) -> Result<Vec<Placement>, StoreError>;

    /// Dancers who competed without a rank.
    fn unranked_entrants(&self, competition_id: &CompetitionId) -> Result<Vec<DancerId>, StoreError>;

    fn issued_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
    ) -> Result<Option<u32>, StoreError>;

    fn counted_rewards_for_dancer(&self, dancer_id: &DancerId) -> Result<Vec<u32>, StoreError>;

    fn dancer_totals(&self) -> Result<Vec<DancerTotal>, StoreError>;

    /// Store a reward and return the value it replaced, if any.
    fn save_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
        points: u32,
    ) -> Result<Option<u32>, StoreError>;

    fn save_dancer_total(&self, dancer_id: &DancerId, total: u64) -> Result<(), StoreError>;

    fn save_dancer_ranks(&self, ranks: &[(DancerId, u32)]) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("dancer not found: {0}")]
    DancerNotFound(DancerId),
    #[error("competition not found: {0}")]
    CompetitionNotFound(CompetitionId),
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("rank batch must cover all {expected} dancers, got {received}")]
    PartialRankBatch { expected: usize, received: usize },
    #[error("unsupported store version: {0}")]
    UnsupportedVersion(u32),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
