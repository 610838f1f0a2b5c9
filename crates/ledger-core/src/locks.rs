//! # Per-Asset Locks
//!
//! Explicit mutual exclusion keyed by `AssetId`.
//!
//! Every mutation reads the asset's chain, plans, and commits while holding
//! that asset's lock, so two edits of the same asset can never plan against
//! the same successor. Mutations of different assets do not contend.

use crate::{AssetId, LedgerError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Registry of per-asset mutexes.
#[derive(Debug, Default)]
pub struct AssetLocks {
    slots: Mutex<BTreeMap<AssetId, Arc<Mutex<()>>>>,
}

impl AssetLocks {
    /// Create an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `asset`.
    pub fn with_asset<T>(
        &self,
        asset: &AssetId,
        f: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let slot = {
            let mut slots = self.slots.lock().map_err(LedgerError::storage)?;
            Arc::clone(slots.entry(asset.clone()).or_default())
        };

        let result = {
            let _held = slot.lock().map_err(LedgerError::storage)?;
            f()
        };

        self.release(asset, slot);
        result
    }

    /// Number of assets with a live lock slot.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    /// Drop the slot when no other caller holds or waits on it.
    fn release(&self, asset: &AssetId, slot: Arc<Mutex<()>>) {
        if let Ok(mut slots) = self.slots.lock() {
            // One reference in the map, one in `slot`.
            if Arc::strong_count(&slot) == 2 {
                slots.remove(asset);
            }
        }
    }
}
