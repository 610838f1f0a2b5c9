//! # ledger-core
//!
//! The movement ledger engine - THE LOGIC.
//!
//! Records every relocation of a tracked asset between the central
//! warehouse and the sites of organizational units, and keeps the chain of
//! records consistent under create, edit and delete.
//!
//! ## Chain Invariants
//!
//! For every asset, ordered by `Sequence`:
//! - The first record departs the warehouse
//! - Each record starts where its predecessor ended
//! - No record ends where it starts
//! - Business dates never decrease and never leave
//!   `[registration date, today]`
//! - The asset's cached location equals the projection of its latest record
//!
//! ## Architectural Constraints
//!
//! - Pure, synchronous Rust: NO async, NO network, NO logging
//! - Planning is side-effect free; all writes of a mutation commit together
//! - `BTreeMap` only, for deterministic iteration

// =============================================================================
// MODULES
// =============================================================================

pub mod cascade;
pub mod chain;
pub mod clock;
pub mod conflict;
pub mod direction;
pub mod locks;
pub mod mutation;
pub mod primitives;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod timeline;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Asset, AssetId, AssetRegistration, Condition, CurrentLocation, Direction, ErrorKind,
    LedgerError, ListOrder, Location, LocationClass, MovementCode, MovementDraft, MovementPatch,
    MovementRecord, NewMovement, Sequence, SiteId, UnitId,
};

// =============================================================================
// RE-EXPORTS: Ledger Engine
// =============================================================================

pub use cascade::CascadeEngine;
pub use chain::{AssetChain, ChainViolation};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::ConflictChecker;
pub use direction::DirectionRules;
pub use locks::AssetLocks;
pub use mutation::{EditPlan, MutationEngine, PlanContext};
pub use resolver::LocationResolver;
pub use service::Ledger;
pub use storage::{
    CommitOutcome, LedgerBatch, LedgerStats, LedgerStore, MemoryLedger, RedbLedger,
    StorageBackend,
};
pub use timeline::{LedgerPolicy, TimelineValidator};
