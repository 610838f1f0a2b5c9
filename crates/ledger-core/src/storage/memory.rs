//! In-memory ledger store.

use super::{CommitOutcome, LedgerBatch, LedgerStats, LedgerStore, check_replacement};
use crate::primitives::FIRST_SEQUENCE;
use crate::resolver::LocationResolver;
use crate::{Asset, AssetId, LedgerError, MovementCode, MovementRecord, Sequence};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MemoryState {
    assets: BTreeMap<AssetId, Asset>,
    movements: BTreeMap<Sequence, MovementRecord>,
    codes: BTreeMap<MovementCode, Sequence>,
    next_sequence: Sequence,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            assets: BTreeMap::new(),
            movements: BTreeMap::new(),
            codes: BTreeMap::new(),
            next_sequence: Sequence(FIRST_SEQUENCE),
        }
    }
}

/// Volatile ledger store backed by `BTreeMap`s.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<MemoryState>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::StorageUnavailable("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::StorageUnavailable("ledger lock poisoned".to_string()))
    }
}

impl LedgerStore for MemoryLedger {
    fn insert_asset(&self, asset: &Asset) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        if state.assets.contains_key(&asset.id) {
            return Err(LedgerError::AssetExists(asset.id.clone()));
        }
        state.assets.insert(asset.id.clone(), asset.clone());
        Ok(())
    }

    fn asset(&self, id: &AssetId) -> Result<Option<Asset>, LedgerError> {
        Ok(self.read()?.assets.get(id).cloned())
    }

    fn asset_movements(&self, id: &AssetId) -> Result<Vec<MovementRecord>, LedgerError> {
        Ok(self
            .read()?
            .movements
            .values()
            .filter(|r| r.asset_id == *id)
            .cloned()
            .collect())
    }

    fn movement(&self, code: &MovementCode) -> Result<Option<MovementRecord>, LedgerError> {
        let state = self.read()?;
        Ok(state
            .codes
            .get(code)
            .and_then(|seq| state.movements.get(seq))
            .cloned())
    }

    fn movements(&self) -> Result<Vec<MovementRecord>, LedgerError> {
        Ok(self.read()?.movements.values().cloned().collect())
    }

    fn commit(&self, batch: LedgerBatch) -> Result<CommitOutcome, LedgerError> {
        let mut guard = self.write()?;

        // Stage on a copy so a failed batch leaves the live state untouched.
        let mut state = guard.clone();

        if !state.assets.contains_key(&batch.asset_id) {
            return Err(LedgerError::AssetNotFound(batch.asset_id));
        }

        for record in batch.replace {
            let stored = state
                .codes
                .get(&record.code)
                .and_then(|seq| state.movements.get(seq));
            check_replacement(&batch.asset_id, stored, &record)?;
            state.movements.insert(record.sequence, record);
        }

        if let Some(code) = batch.remove {
            let seq = state
                .codes
                .get(&code)
                .copied()
                .filter(|seq| {
                    state
                        .movements
                        .get(seq)
                        .is_some_and(|r| r.asset_id == batch.asset_id)
                })
                .ok_or_else(|| LedgerError::MovementNotFound(code.clone()))?;
            state.movements.remove(&seq);
            state.codes.remove(&code);
        }

        let appended = match batch.append {
            Some(draft) => {
                let sequence = state.next_sequence;
                state.next_sequence = sequence.next();
                let record = draft.into_record(sequence);
                state.codes.insert(record.code.clone(), sequence);
                state.movements.insert(sequence, record.clone());
                Some(record)
            }
            None => None,
        };

        let latest = state
            .movements
            .values()
            .rev()
            .find(|r| r.asset_id == batch.asset_id);
        let location = LocationResolver::project(latest);
        if let Some(asset) = state.assets.get_mut(&batch.asset_id) {
            asset.location = location.clone();
        }

        *guard = state;
        Ok(CommitOutcome { appended, location })
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let state = self.read()?;
        Ok(LedgerStats {
            assets: state.assets.len(),
            movements: state.movements.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Condition, Direction, Location, MovementDraft};
    use chrono::{NaiveDate, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
    }

    fn asset(id: &str) -> Asset {
        Asset {
            id: AssetId::new(id),
            registered_on: day(),
            condition: Condition::Good,
            location: Location::Warehouse,
        }
    }

    fn outbound(asset: &str, unit: &str) -> MovementDraft {
        MovementDraft {
            asset_id: AssetId::new(asset),
            direction: Direction::WarehouseToSite,
            source: Location::Warehouse,
            target: Location::site(unit, "1"),
            condition: Condition::Good,
            business_date: day(),
            recorded_at: Utc::now(),
            notes: None,
            processed_by: "clerk".into(),
        }
    }

    #[test]
    fn duplicate_asset_is_rejected() {
        let store = MemoryLedger::new();
        store.insert_asset(&asset("a")).expect("insert");
        let err = store.insert_asset(&asset("a")).expect_err("duplicate");
        assert_eq!(err, LedgerError::AssetExists(AssetId::new("a")));
    }

    #[test]
    fn append_assigns_sequence_and_projects() {
        let store = MemoryLedger::new();
        store.insert_asset(&asset("a")).expect("insert");

        let outcome = store
            .commit(LedgerBatch::appending(outbound("a", "u")))
            .expect("commit");
        let record = outcome.appended.expect("appended");

        assert_eq!(record.sequence, Sequence(FIRST_SEQUENCE));
        assert_eq!(outcome.location, Location::site("u", "1"));
        assert_eq!(
            store.asset(&AssetId::new("a")).expect("read").map(|a| a.location),
            Some(Location::site("u", "1"))
        );
        assert_eq!(store.movement(&record.code).expect("read"), Some(record));
    }

    #[test]
    fn sequences_are_global_and_never_reused() {
        let store = MemoryLedger::new();
        store.insert_asset(&asset("a")).expect("insert");
        store.insert_asset(&asset("b")).expect("insert");

        let first = store
            .commit(LedgerBatch::appending(outbound("a", "u")))
            .expect("commit")
            .appended
            .expect("record");
        store
            .commit(LedgerBatch::removing(AssetId::new("a"), first.code.clone()))
            .expect("remove");
        let second = store
            .commit(LedgerBatch::appending(outbound("b", "u")))
            .expect("commit")
            .appended
            .expect("record");

        assert!(second.sequence > first.sequence);
        assert_eq!(store.movement(&first.code).expect("read"), None);
    }

    #[test]
    fn failed_batch_leaves_state_untouched() {
        let store = MemoryLedger::new();
        store.insert_asset(&asset("a")).expect("insert");

        let mut batch = LedgerBatch::appending(outbound("a", "u"));
        batch.remove = Some(MovementCode::new("MV-missing"));

        assert!(store.commit(batch).is_err());
        assert_eq!(store.stats().expect("stats").movements, 0);
    }

    #[test]
    fn commit_for_unknown_asset_fails() {
        let store = MemoryLedger::new();
        let err = store
            .commit(LedgerBatch::appending(outbound("ghost", "u")))
            .expect_err("unknown");
        assert_eq!(err, LedgerError::AssetNotFound(AssetId::new("ghost")));
    }
}
