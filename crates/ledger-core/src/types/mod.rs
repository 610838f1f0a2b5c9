//! # Core Type Definitions
//!
//! This module contains all core types for the movement ledger:
//! - Identifiers (`AssetId`, `UnitId`, `SiteId`, `MovementCode`, `Sequence`)
//! - Positions and movement kinds (`Location`, `Direction`, `Condition`)
//! - Ledger records (`Asset`, `MovementRecord`, `MovementDraft`)
//! - Request shapes (`AssetRegistration`, `NewMovement`, `MovementPatch`)
//! - Error types (`LedgerError`, `ErrorKind`)
//!
//! ## Ordering Guarantees
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`.
//! Chronology is carried by `Sequence` alone; `business_date` is a
//! validated attribute and never an ordering key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a tracked asset, owned by the Asset Registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

/// Identifier of an organizational unit (master data foreign key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

/// Identifier of a site inside an organizational unit (master data foreign key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub String);

/// Unique, immutable code of a movement record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementCode(pub String);

macro_rules! string_id {
    ($($name:ident),*) => {
        $(
            impl $name {
                /// Create a new identifier from a string.
                #[must_use]
                pub fn new(s: impl Into<String>) -> Self {
                    Self(s.into())
                }

                /// Get the identifier as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_id!(AssetId, UnitId, SiteId, MovementCode);

impl MovementCode {
    /// Prefix shared by every store-assigned movement code.
    pub const PREFIX: &'static str = "MV-";

    /// Derive the code for a freshly allocated sequence number.
    #[must_use]
    pub fn for_sequence(sequence: Sequence) -> Self {
        Self(format!("{}{:08}", Self::PREFIX, sequence.0))
    }
}

/// Immutable creation-order key of a movement record.
///
/// Assigned by the store from a strictly increasing counter. Gaps are
/// allowed (deleted records); reuse never happens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Sequence(pub u64);

impl Sequence {
    /// The sequence allocated after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

// =============================================================================
// LOCATION
// =============================================================================

/// Where an asset is: the central warehouse or a site of an organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Location {
    /// The central warehouse.
    #[default]
    Warehouse,
    /// A site inside an organizational unit.
    Site {
        /// Owning organizational unit.
        unit: UnitId,
        /// Site inside the unit.
        site: SiteId,
    },
}

impl Location {
    /// Build a site location.
    #[must_use]
    pub fn site(unit: impl Into<String>, site: impl Into<String>) -> Self {
        Self::Site {
            unit: UnitId::new(unit),
            site: SiteId::new(site),
        }
    }

    /// Check whether this is the warehouse.
    #[must_use]
    pub fn is_warehouse(&self) -> bool {
        matches!(self, Self::Warehouse)
    }

    /// The coarse class of this location.
    #[must_use]
    pub fn class(&self) -> LocationClass {
        match self {
            Self::Warehouse => LocationClass::Warehouse,
            Self::Site { .. } => LocationClass::Site,
        }
    }

    /// The organizational unit, if this is a site.
    #[must_use]
    pub fn unit(&self) -> Option<&UnitId> {
        match self {
            Self::Warehouse => None,
            Self::Site { unit, .. } => Some(unit),
        }
    }

    /// The site identifier, if this is a site.
    #[must_use]
    pub fn site_id(&self) -> Option<&SiteId> {
        match self {
            Self::Warehouse => None,
            Self::Site { site, .. } => Some(site),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warehouse => f.write_str("warehouse"),
            Self::Site { unit, site } => write!(f, "{}/{}", unit, site),
        }
    }
}

/// Coarse location class exposed by `ResolveCurrentLocation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationClass {
    Warehouse,
    Site,
}

impl LocationClass {
    /// Wire name of the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warehouse => "warehouse",
            Self::Site => "site",
        }
    }
}

/// Resolved current location of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentLocation {
    pub location_class: LocationClass,
    pub unit: Option<UnitId>,
    pub site: Option<SiteId>,
}

impl From<&Location> for CurrentLocation {
    fn from(location: &Location) -> Self {
        Self {
            location_class: location.class(),
            unit: location.unit().cloned(),
            site: location.site_id().cloned(),
        }
    }
}

// =============================================================================
// DIRECTION & CONDITION
// =============================================================================

/// Kind of a single relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    WarehouseToSite,
    SiteToSite,
    SiteToWarehouse,
}

impl Direction {
    /// All directions, in declaration order.
    pub const ALL: [Self; 3] = [Self::WarehouseToSite, Self::SiteToSite, Self::SiteToWarehouse];

    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WarehouseToSite => "warehouse_to_site",
            Self::SiteToSite => "site_to_site",
            Self::SiteToWarehouse => "site_to_warehouse",
        }
    }

    /// Whether the movement starts at the warehouse.
    #[must_use]
    pub const fn departs_warehouse(self) -> bool {
        matches!(self, Self::WarehouseToSite)
    }

    /// Whether the movement ends at the warehouse.
    #[must_use]
    pub const fn arrives_warehouse(self) -> bool {
        matches!(self, Self::SiteToWarehouse)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidRequest(format!("unknown direction '{}'", s)))
    }
}

/// Asset condition as observed at a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Good,
    LightlyDamaged,
    HeavilyDamaged,
}

impl Condition {
    pub const ALL: [Self; 3] = [Self::Good, Self::LightlyDamaged, Self::HeavilyDamaged];

    /// Wire name of the condition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::LightlyDamaged => "lightly_damaged",
            Self::HeavilyDamaged => "heavily_damaged",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidRequest(format!("unknown condition '{}'", s)))
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A tracked physical unit.
///
/// `location` is a cache of the Location Resolver's output. It is written
/// by the store after every commit and is never an input to planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Earliest permissible movement date.
    pub registered_on: NaiveDate,
    /// Condition recorded at registration. Movements never overwrite it.
    pub condition: Condition,
    /// Cached current location.
    pub location: Location,
}

/// One entry of an asset's movement ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub code: MovementCode,
    pub asset_id: AssetId,
    pub direction: Direction,
    pub source: Location,
    pub target: Location,
    /// Condition observed at this movement.
    pub condition: Condition,
    /// User-editable date the movement actually happened.
    pub business_date: NaiveDate,
    /// Immutable ordering key.
    pub sequence: Sequence,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub processed_by: String,
}

/// A movement accepted by the planner but not yet assigned a code or sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    pub asset_id: AssetId,
    pub direction: Direction,
    pub source: Location,
    pub target: Location,
    pub condition: Condition,
    pub business_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub processed_by: String,
}

impl MovementDraft {
    /// Turn the draft into a record under the allocated sequence.
    #[must_use]
    pub fn into_record(self, sequence: Sequence) -> MovementRecord {
        MovementRecord {
            code: MovementCode::for_sequence(sequence),
            asset_id: self.asset_id,
            direction: self.direction,
            source: self.source,
            target: self.target,
            condition: self.condition,
            business_date: self.business_date,
            sequence,
            recorded_at: self.recorded_at,
            notes: self.notes,
            processed_by: self.processed_by,
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Seed data for an asset, supplied by the Asset Registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistration {
    pub id: AssetId,
    pub registered_on: NaiveDate,
    pub condition: Condition,
}

/// Arguments of `CreateMovement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub asset_id: AssetId,
    pub direction: Direction,
    /// Declared source unit; checked against the derived-before location.
    pub source_unit: Option<UnitId>,
    pub target_unit: Option<UnitId>,
    pub target_site: Option<SiteId>,
    pub condition: Condition,
    /// Defaults to today.
    pub business_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub processed_by: String,
}

/// Partial fields of `EditMovement`. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MovementPatch {
    pub direction: Option<Direction>,
    pub source_unit: Option<UnitId>,
    pub target_unit: Option<UnitId>,
    pub target_site: Option<SiteId>,
    pub condition: Option<Condition>,
    pub business_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub processed_by: Option<String>,
}

impl MovementPatch {
    /// Whether the patch touches a field the Cascade Engine reacts to.
    #[must_use]
    pub fn touches_position(&self) -> bool {
        self.direction.is_some() || self.target_unit.is_some() || self.target_site.is_some()
    }
}

/// Ordering of `ListMovements` output by sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    #[default]
    Descending,
    Ascending,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Reportable error kinds, one per distinct failure the ledger can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DirectionViolation,
    SourceMismatch,
    FutureDate,
    PredatesRegistration,
    PrecedesPrevious,
    FollowsNext,
    TooOld,
    NoOpMovement,
    TargetConflict,
    CascadeConflict,
    NotLastRecord,
    NotFound,
    AssetExists,
    InvalidRequest,
    StorageUnavailable,
    Serialization,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectionViolation => "DirectionViolation",
            Self::SourceMismatch => "SourceMismatch",
            Self::FutureDate => "FutureDate",
            Self::PredatesRegistration => "PredatesRegistration",
            Self::PrecedesPrevious => "PrecedesPrevious",
            Self::FollowsNext => "FollowsNext",
            Self::TooOld => "TooOld",
            Self::NoOpMovement => "NoOpMovement",
            Self::TargetConflict => "TargetConflict",
            Self::CascadeConflict => "CascadeConflict",
            Self::NotLastRecord => "NotLastRecord",
            Self::NotFound => "NotFound",
            Self::AssetExists => "AssetExists",
            Self::InvalidRequest => "InvalidRequest",
            Self::StorageUnavailable => "StorageUnavailable",
            Self::Serialization => "Serialization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the movement ledger.
///
/// - Validation variants are detected before any write; the whole
///   mutation is abandoned and nothing is committed.
/// - Only `StorageUnavailable` represents a transient fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("direction {direction} is not admissible while the asset is at {before}")]
    DirectionViolation {
        direction: Direction,
        before: Location,
    },

    #[error("declared source unit {declared} does not match {}", describe_unit(.expected.as_ref()))]
    SourceMismatch {
        declared: UnitId,
        expected: Option<UnitId>,
    },

    #[error("business date {date} is after today ({today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    #[error("business date {date} predates asset registration on {registered_on}")]
    PredatesRegistration {
        date: NaiveDate,
        registered_on: NaiveDate,
    },

    #[error("business date {date} precedes {previous} dated {previous_date}")]
    PrecedesPrevious {
        date: NaiveDate,
        previous: MovementCode,
        previous_date: NaiveDate,
    },

    #[error("business date {date} follows {next} dated {next_date}")]
    FollowsNext {
        date: NaiveDate,
        next: MovementCode,
        next_date: NaiveDate,
    },

    #[error("business date {date} is earlier than {earliest}")]
    TooOld { date: NaiveDate, earliest: NaiveDate },

    #[error("movement would leave the asset where it already is ({location})")]
    NoOpMovement { location: Location },

    #[error("target {location} equals the target of the following movement {next}")]
    TargetConflict {
        next: MovementCode,
        location: Location,
    },

    #[error("following movement {next} would run from the warehouse to the warehouse")]
    CascadeConflict { next: MovementCode },

    #[error("movement {code} is not the latest for its asset (latest is {latest})")]
    NotLastRecord {
        code: MovementCode,
        latest: MovementCode,
    },

    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("movement not found: {0}")]
    MovementNotFound(MovementCode),

    #[error("asset already registered: {0}")]
    AssetExists(AssetId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn describe_unit(unit: Option<&UnitId>) -> String {
    unit.map_or_else(|| "the warehouse".to_string(), |u| format!("unit {}", u))
}

impl LedgerError {
    /// The reportable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DirectionViolation { .. } => ErrorKind::DirectionViolation,
            Self::SourceMismatch { .. } => ErrorKind::SourceMismatch,
            Self::FutureDate { .. } => ErrorKind::FutureDate,
            Self::PredatesRegistration { .. } => ErrorKind::PredatesRegistration,
            Self::PrecedesPrevious { .. } => ErrorKind::PrecedesPrevious,
            Self::FollowsNext { .. } => ErrorKind::FollowsNext,
            Self::TooOld { .. } => ErrorKind::TooOld,
            Self::NoOpMovement { .. } => ErrorKind::NoOpMovement,
            Self::TargetConflict { .. } => ErrorKind::TargetConflict,
            Self::CascadeConflict { .. } => ErrorKind::CascadeConflict,
            Self::NotLastRecord { .. } => ErrorKind::NotLastRecord,
            Self::AssetNotFound(_) | Self::MovementNotFound(_) => ErrorKind::NotFound,
            Self::AssetExists(_) => ErrorKind::AssetExists,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether retrying the same call could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Shorthand for wrapping a storage-layer fault.
    pub(crate) fn storage(e: impl fmt::Display) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
