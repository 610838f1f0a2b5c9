//! # Ledger Storage
//!
//! The `LedgerStore` trait and its two backends:
//! - `MemoryLedger`: `BTreeMap`s behind a `RwLock` (fast, volatile)
//! - `RedbLedger`: redb embedded database (ACID, persistent)
//!
//! Every mutation reaches a store as one `LedgerBatch`, applied in a single
//! transaction. After the writes the store re-reads the asset's
//! sequence-latest record and rewrites the cached location from it, inside
//! the same transaction.

mod memory;
mod redb_ledger;

pub use memory::MemoryLedger;
pub use redb_ledger::RedbLedger;

use crate::{Asset, AssetId, LedgerError, Location, MovementCode, MovementDraft, MovementRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All writes of one ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerBatch {
    /// The asset every write belongs to.
    pub asset_id: AssetId,
    /// New record; the store assigns its sequence and code.
    pub append: Option<MovementDraft>,
    /// Existing records to overwrite, matched by code.
    pub replace: Vec<MovementRecord>,
    /// Record to delete.
    pub remove: Option<MovementCode>,
}

impl LedgerBatch {
    /// An empty batch. Committing it only re-projects the cached location.
    #[must_use]
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            append: None,
            replace: Vec::new(),
            remove: None,
        }
    }

    #[must_use]
    pub fn appending(draft: MovementDraft) -> Self {
        let mut batch = Self::new(draft.asset_id.clone());
        batch.append = Some(draft);
        batch
    }

    #[must_use]
    pub fn removing(asset_id: AssetId, code: MovementCode) -> Self {
        let mut batch = Self::new(asset_id);
        batch.remove = Some(code);
        batch
    }

    /// Whether the batch writes no record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.append.is_none() && self.replace.is_empty() && self.remove.is_none()
    }
}

/// Result of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The appended record with its assigned sequence and code.
    pub appended: Option<MovementRecord>,
    /// The asset's cached location after the commit.
    pub location: Location,
}

/// Record counts of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub assets: usize,
    pub movements: usize,
}

/// Backing store of the ledger.
///
/// Implementations take `&self` and must be safe to share between threads.
/// Serializing mutations per asset is the caller's job; a store only
/// guarantees that one batch commits atomically.
pub trait LedgerStore: Send + Sync {
    /// Insert a new asset. Fails with `AssetExists` if the id is taken.
    fn insert_asset(&self, asset: &Asset) -> Result<(), LedgerError>;

    fn asset(&self, id: &AssetId) -> Result<Option<Asset>, LedgerError>;

    /// Records of one asset in ascending sequence order.
    fn asset_movements(&self, id: &AssetId) -> Result<Vec<MovementRecord>, LedgerError>;

    fn movement(&self, code: &MovementCode) -> Result<Option<MovementRecord>, LedgerError>;

    /// Every record in ascending sequence order.
    fn movements(&self) -> Result<Vec<MovementRecord>, LedgerError>;

    /// Apply a batch atomically and re-project the asset's cached location.
    fn commit(&self, batch: LedgerBatch) -> Result<CommitOutcome, LedgerError>;

    fn stats(&self) -> Result<LedgerStats, LedgerError>;
}

/// Storage backend of a `Ledger`.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory ledger (fast, volatile).
    InMemory(MemoryLedger),
    /// Disk-backed ledger using redb (ACID, persistent).
    Persistent(RedbLedger),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryLedger::new())
    }
}

impl StorageBackend {
    /// Open or create a redb database at `path`.
    pub fn open_redb(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Ok(Self::Persistent(RedbLedger::open(path)?))
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn store(&self) -> &dyn LedgerStore {
        match self {
            Self::InMemory(memory) => memory,
            Self::Persistent(redb) => redb,
        }
    }
}

impl LedgerStore for StorageBackend {
    fn insert_asset(&self, asset: &Asset) -> Result<(), LedgerError> {
        self.store().insert_asset(asset)
    }

    fn asset(&self, id: &AssetId) -> Result<Option<Asset>, LedgerError> {
        self.store().asset(id)
    }

    fn asset_movements(&self, id: &AssetId) -> Result<Vec<MovementRecord>, LedgerError> {
        self.store().asset_movements(id)
    }

    fn movement(&self, code: &MovementCode) -> Result<Option<MovementRecord>, LedgerError> {
        self.store().movement(code)
    }

    fn movements(&self) -> Result<Vec<MovementRecord>, LedgerError> {
        self.store().movements()
    }

    fn commit(&self, batch: LedgerBatch) -> Result<CommitOutcome, LedgerError> {
        self.store().commit(batch)
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        self.store().stats()
    }
}

/// Reject replacements that do not match a stored record of the batch's asset.
fn check_replacement(
    batch_asset: &AssetId,
    stored: Option<&MovementRecord>,
    replacement: &MovementRecord,
) -> Result<(), LedgerError> {
    match stored {
        Some(s)
            if s.asset_id == *batch_asset
                && replacement.asset_id == *batch_asset
                && s.sequence == replacement.sequence =>
        {
            Ok(())
        }
        _ => Err(LedgerError::MovementNotFound(replacement.code.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, Direction, Location};
    use chrono::{NaiveDate, Utc};

    fn draft() -> MovementDraft {
        MovementDraft {
            asset_id: AssetId::new("asset"),
            direction: Direction::WarehouseToSite,
            source: Location::Warehouse,
            target: Location::site("u", "s"),
            condition: Condition::Good,
            business_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            recorded_at: Utc::now(),
            notes: None,
            processed_by: "clerk".into(),
        }
    }

    #[test]
    fn batch_constructors() {
        assert!(LedgerBatch::new(AssetId::new("asset")).is_empty());

        let append = LedgerBatch::appending(draft());
        assert!(!append.is_empty());
        assert_eq!(append.asset_id, AssetId::new("asset"));

        let remove = LedgerBatch::removing(AssetId::new("asset"), MovementCode::new("MV-1"));
        assert_eq!(remove.remove, Some(MovementCode::new("MV-1")));
    }

    #[test]
    fn default_backend_is_volatile() {
        assert!(!StorageBackend::default().is_persistent());
    }

    #[test]
    fn replacement_must_target_same_asset() {
        let record = draft().into_record(crate::Sequence(1));
        let mut foreign = record.clone();
        foreign.asset_id = AssetId::new("other");

        assert!(check_replacement(&AssetId::new("asset"), Some(&record), &record).is_ok());
        assert!(check_replacement(&AssetId::new("asset"), Some(&record), &foreign).is_err());
        assert!(check_replacement(&AssetId::new("asset"), None, &record).is_err());
    }
}
