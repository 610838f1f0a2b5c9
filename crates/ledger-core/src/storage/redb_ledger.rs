//! # redb-backed Ledger Storage
//!
//! A disk-backed ledger store using the redb embedded database:
//! - ACID transactions (one write transaction per `LedgerBatch`)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are stored once, keyed by `Sequence`, with two indexes next to
//! them: movement code to sequence, and (asset, sequence) for per-asset
//! range scans in chain order.

use super::{CommitOutcome, LedgerBatch, LedgerStats, LedgerStore, check_replacement};
use crate::primitives::{FIRST_SEQUENCE, NEXT_SEQUENCE_KEY};
use crate::resolver::LocationResolver;
use crate::{Asset, AssetId, LedgerError, MovementCode, MovementRecord, Sequence};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for assets: AssetId -> serialized Asset bytes
const ASSETS: TableDefinition<&str, &[u8]> = TableDefinition::new("assets");

/// Table for records: Sequence(u64) -> serialized MovementRecord bytes
const MOVEMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("movements");

/// Table for the code index: MovementCode -> Sequence(u64)
const MOVEMENT_CODES: TableDefinition<&str, u64> = TableDefinition::new("movement_codes");

/// Table for the chain index: (AssetId, Sequence) -> ()
const ASSET_MOVEMENTS: TableDefinition<(&str, u64), ()> = TableDefinition::new("asset_movements");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    postcard::to_allocvec(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    postcard::from_bytes(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// A disk-backed ledger store using redb.
pub struct RedbLedger {
    db: Database,
}

impl std::fmt::Debug for RedbLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLedger").finish_non_exhaustive()
    }
}

impl RedbLedger {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db = Database::create(path.as_ref()).map_err(LedgerError::storage)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(LedgerError::storage)?;
            let _ = write_txn.open_table(ASSETS).map_err(LedgerError::storage)?;
            let _ = write_txn.open_table(MOVEMENTS).map_err(LedgerError::storage)?;
            let _ = write_txn
                .open_table(MOVEMENT_CODES)
                .map_err(LedgerError::storage)?;
            let _ = write_txn
                .open_table(ASSET_MOVEMENTS)
                .map_err(LedgerError::storage)?;
            let _ = write_txn.open_table(METADATA).map_err(LedgerError::storage)?;
            write_txn.commit().map_err(LedgerError::storage)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<bool, LedgerError> {
        self.db.compact().map_err(LedgerError::storage)
    }

    /// The sequence the next appended record will receive.
    pub fn next_sequence(&self) -> Result<Sequence, LedgerError> {
        let read_txn = self.db.begin_read().map_err(LedgerError::storage)?;
        let table = read_txn.open_table(METADATA).map_err(LedgerError::storage)?;
        let next = table
            .get(NEXT_SEQUENCE_KEY)
            .map_err(LedgerError::storage)?
            .map(|v| v.value())
            .unwrap_or(FIRST_SEQUENCE);
        Ok(Sequence(next))
    }
}

fn load_record(
    table: &impl ReadableTable<u64, &'static [u8]>,
    seq: u64,
) -> Result<Option<MovementRecord>, LedgerError> {
    table
        .get(seq)
        .map_err(LedgerError::storage)?
        .map(|data| decode(data.value()))
        .transpose()
}

fn write_record(
    movements: &mut Table<'_, u64, &'static [u8]>,
    record: &MovementRecord,
) -> Result<(), LedgerError> {
    let bytes = encode(record)?;
    movements
        .insert(record.sequence.0, bytes.as_slice())
        .map_err(LedgerError::storage)?;
    Ok(())
}

impl LedgerStore for RedbLedger {
    fn insert_asset(&self, asset: &Asset) -> Result<(), LedgerError> {
        let bytes = encode(asset)?;
        let write_txn = self.db.begin_write().map_err(LedgerError::storage)?;
        {
            let mut assets = write_txn.open_table(ASSETS).map_err(LedgerError::storage)?;
            let exists = assets
                .get(asset.id.as_str())
                .map_err(LedgerError::storage)?
                .is_some();
            if exists {
                return Err(LedgerError::AssetExists(asset.id.clone()));
            }
            assets
                .insert(asset.id.as_str(), bytes.as_slice())
                .map_err(LedgerError::storage)?;
        }
        write_txn.commit().map_err(LedgerError::storage)?;
        Ok(())
    }

    fn asset(&self, id: &AssetId) -> Result<Option<Asset>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(LedgerError::storage)?;
        let assets = read_txn.open_table(ASSETS).map_err(LedgerError::storage)?;
        assets
            .get(id.as_str())
            .map_err(LedgerError::storage)?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn asset_movements(&self, id: &AssetId) -> Result<Vec<MovementRecord>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(LedgerError::storage)?;
        let index = read_txn
            .open_table(ASSET_MOVEMENTS)
            .map_err(LedgerError::storage)?;
        let movements = read_txn.open_table(MOVEMENTS).map_err(LedgerError::storage)?;

        let mut records = Vec::new();
        for entry in index
            .range((id.as_str(), 0u64)..=(id.as_str(), u64::MAX))
            .map_err(LedgerError::storage)?
        {
            let (key, _) = entry.map_err(LedgerError::storage)?;
            let (_, seq) = key.value();
            if let Some(record) = load_record(&movements, seq)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn movement(&self, code: &MovementCode) -> Result<Option<MovementRecord>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(LedgerError::storage)?;
        let codes = read_txn
            .open_table(MOVEMENT_CODES)
            .map_err(LedgerError::storage)?;
        let seq = codes
            .get(code.as_str())
            .map_err(LedgerError::storage)?
            .map(|v| v.value());

        match seq {
            Some(seq) => {
                let movements = read_txn.open_table(MOVEMENTS).map_err(LedgerError::storage)?;
                load_record(&movements, seq)
            }
            None => Ok(None),
        }
    }

    fn movements(&self) -> Result<Vec<MovementRecord>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(LedgerError::storage)?;
        let movements = read_txn.open_table(MOVEMENTS).map_err(LedgerError::storage)?;

        let mut records = Vec::new();
        for entry in movements.iter().map_err(LedgerError::storage)? {
            let (_, value) = entry.map_err(LedgerError::storage)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    fn commit(&self, batch: LedgerBatch) -> Result<CommitOutcome, LedgerError> {
        let asset_key = batch.asset_id.as_str();
        let write_txn = self.db.begin_write().map_err(LedgerError::storage)?;

        let (appended, location) = {
            let mut assets = write_txn.open_table(ASSETS).map_err(LedgerError::storage)?;
            let mut movements = write_txn.open_table(MOVEMENTS).map_err(LedgerError::storage)?;
            let mut codes = write_txn
                .open_table(MOVEMENT_CODES)
                .map_err(LedgerError::storage)?;
            let mut index = write_txn
                .open_table(ASSET_MOVEMENTS)
                .map_err(LedgerError::storage)?;
            let mut meta = write_txn.open_table(METADATA).map_err(LedgerError::storage)?;

            let mut asset: Asset = assets
                .get(asset_key)
                .map_err(LedgerError::storage)?
                .map(|data| decode(data.value()))
                .transpose()?
                .ok_or_else(|| LedgerError::AssetNotFound(batch.asset_id.clone()))?;

            // Replacements
            for record in &batch.replace {
                let seq = codes
                    .get(record.code.as_str())
                    .map_err(LedgerError::storage)?
                    .map(|v| v.value());
                let stored = match seq {
                    Some(seq) => load_record(&movements, seq)?,
                    None => None,
                };
                check_replacement(&batch.asset_id, stored.as_ref(), record)?;
                write_record(&mut movements, record)?;
            }

            // Removal
            if let Some(code) = &batch.remove {
                let seq = codes
                    .get(code.as_str())
                    .map_err(LedgerError::storage)?
                    .map(|v| v.value())
                    .ok_or_else(|| LedgerError::MovementNotFound(code.clone()))?;
                let owned = load_record(&movements, seq)?
                    .is_some_and(|r| r.asset_id == batch.asset_id);
                if !owned {
                    return Err(LedgerError::MovementNotFound(code.clone()));
                }
                movements.remove(seq).map_err(LedgerError::storage)?;
                codes.remove(code.as_str()).map_err(LedgerError::storage)?;
                index.remove((asset_key, seq)).map_err(LedgerError::storage)?;
            }

            // Append
            let appended = match batch.append {
                Some(draft) => {
                    let next = meta
                        .get(NEXT_SEQUENCE_KEY)
                        .map_err(LedgerError::storage)?
                        .map(|v| v.value())
                        .unwrap_or(FIRST_SEQUENCE);
                    let sequence = Sequence(next);
                    let record = draft.into_record(sequence);

                    write_record(&mut movements, &record)?;
                    codes
                        .insert(record.code.as_str(), sequence.0)
                        .map_err(LedgerError::storage)?;
                    index
                        .insert((asset_key, sequence.0), ())
                        .map_err(LedgerError::storage)?;
                    meta.insert(NEXT_SEQUENCE_KEY, sequence.next().0)
                        .map_err(LedgerError::storage)?;
                    Some(record)
                }
                None => None,
            };

            // Re-project the cached location from the latest record
            let latest_seq = match index
                .range((asset_key, 0u64)..=(asset_key, u64::MAX))
                .map_err(LedgerError::storage)?
                .next_back()
            {
                Some(entry) => {
                    let (key, _) = entry.map_err(LedgerError::storage)?;
                    Some(key.value().1)
                }
                None => None,
            };
            let latest = match latest_seq {
                Some(seq) => load_record(&movements, seq)?,
                None => None,
            };

            asset.location = LocationResolver::project(latest.as_ref());
            let bytes = encode(&asset)?;
            assets
                .insert(asset_key, bytes.as_slice())
                .map_err(LedgerError::storage)?;

            (appended, asset.location)
        };

        write_txn.commit().map_err(LedgerError::storage)?;
        Ok(CommitOutcome { appended, location })
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let read_txn = self.db.begin_read().map_err(LedgerError::storage)?;
        let assets = read_txn.open_table(ASSETS).map_err(LedgerError::storage)?;
        let movements = read_txn.open_table(MOVEMENTS).map_err(LedgerError::storage)?;
        Ok(LedgerStats {
            assets: assets.len().map_err(LedgerError::storage)? as usize,
            movements: movements.len().map_err(LedgerError::storage)? as usize,
        })
    }
}
