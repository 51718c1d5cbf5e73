use atomic_write_file::AtomicWriteFile;
use fd_lock::RwLock;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::types::{
    CompetitionId, DancerId, DancerTotal, Placement, RankingDocument, DOCUMENT_VERSION,
};
use super::{RankingStore, StoreError};
use crate::scoring::CompetitionMetrics;

/// Get the default store file path (~/.config/dance-rank/rankings.json)
pub fn get_store_path() -> PathBuf {
    crate::config::get_config_dir().join("rankings.json")
}

/// Load the ranking document from a JSON file
///
/// If the file doesn't exist, returns a new empty document.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_document(path: &Path) -> Result<RankingDocument, StoreError> {
    if !path.exists() {
        return Ok(RankingDocument::new());
    }

    let file = File::open(path)?;
    let doc: RankingDocument = serde_json::from_reader(file)?;

    if doc.version != DOCUMENT_VERSION {
        return Err(StoreError::UnsupportedVersion(doc.version));
    }

    Ok(doc)
}

/// Save the ranking document to a JSON file atomically
///
/// The file on disk is either the previous document or the new one, never a
/// mix of both.
pub fn save_document(path: &Path, doc: &RankingDocument) -> Result<(), StoreError> {
    ensure_parent_dir(path)?;

    let mut file = AtomicWriteFile::open(path)?;
    serde_json::to_writer_pretty(&mut file, doc)?;
    file.commit()?;

    Ok(())
}

/// Sidecar lock file next to the store (`rankings.json` -> `rankings.json.lock`)
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "rankings.json".into());
    name.push(".lock");
    path.with_file_name(name)
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// JSON-file backed store shared between processes.
///
/// Reads load the file under a shared advisory lock. Writes take the
/// exclusive lock, reload the document, apply the change and commit it
/// before releasing the lock, so separate `dance-rank` runs never overwrite
/// each other's changes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = load_document(&path)?;
        tracing::debug!(path = %path.display(), dancers = doc.dancers.len(), "opened ranking store");
        Ok(Self {
            lock_path: lock_path(&path),
            path,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document as stored on disk.
    pub fn snapshot(&self) -> Result<RankingDocument, StoreError> {
        if !self.path.exists() {
            return Ok(RankingDocument::new());
        }
        let lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock.read()?;
        load_document(&self.path)
    }

    /// Apply a change and persist it in one step.
    ///
    /// The change is applied to a fresh load of the file; if `f` or the
    /// commit fails, the file is left as it was.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut RankingDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        ensure_parent_dir(&self.path)?;
        let mut lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock.write()?;

        let mut next = load_document(&self.path)?;
        let value = f(&mut next)?;
        save_document(&self.path, &next)?;
        Ok(value)
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }
}

impl RankingStore for FileStore {
    fn competition_metrics(&self, competition_id: &CompetitionId) -> Result<CompetitionMetrics, StoreError> {
        self.snapshot()?.competition_metrics(competition_id)
    }

    fn placements(&self, competition_id: &CompetitionId) -> Result<Vec<Placement>, StoreError> {
        self.snapshot()?.placements(competition_id)
    }

    fn unranked_entrants(&self, competition_id: &CompetitionId) -> Result<Vec<DancerId>, StoreError> {
        self.snapshot()?.unranked_entrants(competition_id)
    }

    fn issued_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
    ) -> Result<Option<u32>, StoreError> {
        self.snapshot()?.issued_reward(competition_id, dancer_id)
    }

    fn counted_rewards_for_dancer(&self, dancer_id: &DancerId) -> Result<Vec<u32>, StoreError> {
        self.snapshot()?.counted_rewards_for_dancer(dancer_id)
    }

    fn dancer_totals(&self) -> Result<Vec<DancerTotal>, StoreError> {
        Ok(self.snapshot()?.dancer_totals())
    }

    fn save_reward(
        &self,
        competition_id: &CompetitionId,
        dancer_id: &DancerId,
        points: u32,
    ) -> Result<Option<u32>, StoreError> {
        self.update(|doc| doc.save_reward(competition_id, dancer_id, points))
    }

    fn save_dancer_total(&self, dancer_id: &DancerId, total: u64) -> Result<(), StoreError> {
        self.update(|doc| doc.save_dancer_total(dancer_id, total))
    }

    fn save_dancer_ranks(&self, ranks: &[(DancerId, u32)]) -> Result<(), StoreError> {
        self.update(|doc| doc.save_dancer_ranks(ranks))
    }
}
