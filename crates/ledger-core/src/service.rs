//! # Ledger Service
//!
//! `Ledger` wires a `LedgerStore` to the planning components and is the
//! only entry point callers need.
//!
//! Every mutation runs under its asset's lock: read the chain, plan with
//! the `MutationEngine`, commit the resulting batch. A rejected plan never
//! reaches the store.

use crate::chain::{AssetChain, ChainViolation};
use crate::clock::{Clock, SystemClock};
use crate::locks::AssetLocks;
use crate::mutation::{MutationEngine, PlanContext, validate_identifier};
use crate::resolver::LocationResolver;
use crate::storage::{LedgerBatch, LedgerStats, LedgerStore, StorageBackend};
use crate::timeline::LedgerPolicy;
use crate::{
    Asset, AssetId, AssetRegistration, CurrentLocation, LedgerError, ListOrder, Location,
    MovementCode, MovementPatch, MovementRecord, NewMovement,
};

/// The movement ledger.
pub struct Ledger<S: LedgerStore = StorageBackend> {
    store: S,
    clock: Box<dyn Clock>,
    policy: LedgerPolicy,
    locks: AssetLocks,
}

impl<S: LedgerStore + std::fmt::Debug> std::fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Ledger<StorageBackend> {
    fn default() -> Self {
        Self::new(StorageBackend::default())
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Create a ledger over `store` with the system clock and default policy.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Box::new(SystemClock),
            policy: LedgerPolicy::default(),
            locks: AssetLocks::new(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    fn context(&self) -> PlanContext {
        PlanContext {
            now: self.clock.now(),
            today: self.clock.today(),
            policy: self.policy,
        }
    }

    fn chain(&self, id: &AssetId) -> Result<AssetChain, LedgerError> {
        let asset = self.asset(id)?;
        let records = self.store.asset_movements(id)?;
        Ok(AssetChain::new(asset, records))
    }

    fn owner_of(&self, code: &MovementCode) -> Result<AssetId, LedgerError> {
        Ok(self.movement(code)?.asset_id)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Seed an asset. Its location starts at the warehouse.
    pub fn register_asset(&self, registration: AssetRegistration) -> Result<Asset, LedgerError> {
        validate_identifier("asset_id", registration.id.as_str())?;

        let today = self.clock.today();
        if registration.registered_on > today {
            return Err(LedgerError::FutureDate {
                date: registration.registered_on,
                today,
            });
        }

        let asset = Asset {
            id: registration.id,
            registered_on: registration.registered_on,
            condition: registration.condition,
            location: Location::Warehouse,
        };
        self.locks
            .with_asset(&asset.id, || self.store.insert_asset(&asset))?;
        Ok(asset)
    }

    /// Append a movement to the asset's chain.
    pub fn create_movement(&self, request: NewMovement) -> Result<MovementRecord, LedgerError> {
        self.locks.with_asset(&request.asset_id, || {
            let chain = self.chain(&request.asset_id)?;
            let draft = MutationEngine::plan_create(&chain, &request, &self.context())?;
            self.store
                .commit(LedgerBatch::appending(draft))?
                .appended
                .ok_or_else(|| {
                    LedgerError::StorageUnavailable("append was not applied".to_string())
                })
        })
    }

    /// Edit a movement, cascading onto its successor where needed.
    pub fn edit_movement(
        &self,
        code: &MovementCode,
        patch: MovementPatch,
    ) -> Result<MovementRecord, LedgerError> {
        let asset_id = self.owner_of(code)?;
        self.locks.with_asset(&asset_id, || {
            let chain = self.chain(&asset_id)?;
            let plan = MutationEngine::plan_edit(&chain, code, &patch, &self.context())?;
            let record = plan.record.clone();
            self.store.commit(plan.into_batch())?;
            Ok(record)
        })
    }

    /// Delete the sequence-latest movement of its asset. Returns the removed record.
    pub fn delete_movement(&self, code: &MovementCode) -> Result<MovementRecord, LedgerError> {
        let asset_id = self.owner_of(code)?;
        self.locks.with_asset(&asset_id, || {
            let chain = self.chain(&asset_id)?;
            let removed = MutationEngine::plan_delete(&chain, code)?;
            self.store
                .commit(LedgerBatch::removing(asset_id.clone(), code.clone()))?;
            Ok(removed)
        })
    }

    /// Rewrite the asset's cached location from its chain.
    pub fn reproject(&self, id: &AssetId) -> Result<Asset, LedgerError> {
        self.locks.with_asset(id, || {
            self.store.commit(LedgerBatch::new(id.clone()))?;
            self.asset(id)
        })
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn asset(&self, id: &AssetId) -> Result<Asset, LedgerError> {
        self.store
            .asset(id)?
            .ok_or_else(|| LedgerError::AssetNotFound(id.clone()))
    }

    pub fn movement(&self, code: &MovementCode) -> Result<MovementRecord, LedgerError> {
        self.store
            .movement(code)?
            .ok_or_else(|| LedgerError::MovementNotFound(code.clone()))
    }

    /// Movement records ordered by sequence, for one asset or for all.
    pub fn list_movements(
        &self,
        asset: Option<&AssetId>,
        order: ListOrder,
    ) -> Result<Vec<MovementRecord>, LedgerError> {
        let mut records = match asset {
            Some(id) => {
                self.asset(id)?;
                self.store.asset_movements(id)?
            }
            None => self.store.movements()?,
        };
        records.sort_by_key(|r| r.sequence);
        if order == ListOrder::Descending {
            records.reverse();
        }
        Ok(records)
    }

    /// The asset's location, derived from its chain rather than the cache.
    pub fn resolve_current_location(&self, id: &AssetId) -> Result<CurrentLocation, LedgerError> {
        self.asset(id)?;
        let records = self.store.asset_movements(id)?;
        Ok(LocationResolver::resolve(&records))
    }

    /// Check the stored chain of an asset against every ledger invariant.
    pub fn audit(&self, id: &AssetId) -> Result<Vec<ChainViolation>, LedgerError> {
        Ok(self.chain(id)?.audit(self.clock.today()))
    }

    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        self.store.stats()
    }
}
