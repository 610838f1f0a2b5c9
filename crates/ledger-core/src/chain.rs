//! # Asset Chain
//!
//! An asset together with its movement records in `Sequence` order.
//!
//! This is the snapshot every plan is computed against: neighbour lookups,
//! the derived-before location of a record, and the invariant audit all
//! read from it.

use crate::direction::DirectionRules;
use crate::resolver::LocationResolver;
use crate::{Asset, Direction, Location, MovementCode, MovementRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An asset and its ordered movement history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetChain {
    asset: Asset,
    records: Vec<MovementRecord>,
}

impl AssetChain {
    /// Build a chain, sorting records by sequence.
    #[must_use]
    pub fn new(asset: Asset, mut records: Vec<MovementRecord>) -> Self {
        records.sort_by_key(|r| r.sequence);
        Self { asset, records }
    }

    #[must_use]
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Records in ascending sequence order.
    #[must_use]
    pub fn records(&self) -> &[MovementRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a record in the chain.
    #[must_use]
    pub fn position(&self, code: &MovementCode) -> Option<usize> {
        self.records.iter().position(|r| r.code == *code)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MovementRecord> {
        self.records.get(index)
    }

    /// Record immediately before `index`.
    #[must_use]
    pub fn predecessor(&self, index: usize) -> Option<&MovementRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    /// Record immediately after `index`.
    #[must_use]
    pub fn successor(&self, index: usize) -> Option<&MovementRecord> {
        self.records.get(index.saturating_add(1))
    }

    /// The sequence-latest record.
    #[must_use]
    pub fn latest(&self) -> Option<&MovementRecord> {
        self.records.last()
    }

    /// Where the asset was right before the record at `index`.
    #[must_use]
    pub fn location_before(&self, index: usize) -> Location {
        LocationResolver::project(self.predecessor(index))
    }

    /// Where the asset is after the whole chain.
    #[must_use]
    pub fn current_location(&self) -> Location {
        LocationResolver::project(self.latest())
    }

    /// Check every chain invariant and the cached location.
    ///
    /// An empty result means the chain is consistent.
    #[must_use]
    pub fn audit(&self, today: NaiveDate) -> Vec<ChainViolation> {
        let mut violations = Vec::new();

        if let Some(first) = self
            .records
            .first()
            .filter(|r| r.direction != Direction::WarehouseToSite)
        {
            violations.push(ChainViolation::FirstNotFromWarehouse {
                code: first.code.clone(),
            });
        }

        for (index, record) in self.records.iter().enumerate() {
            let before = self.location_before(index);

            if record.source != before {
                violations.push(ChainViolation::Discontinuity {
                    code: record.code.clone(),
                    expected: before,
                    found: record.source.clone(),
                });
            }

            if record.source == record.target {
                violations.push(ChainViolation::NoOp {
                    code: record.code.clone(),
                });
            }

            let derived = DirectionRules::derive(&record.source, &record.target);
            if derived.is_some_and(|d| d != record.direction) {
                violations.push(ChainViolation::DirectionMismatch {
                    code: record.code.clone(),
                    direction: record.direction,
                });
            }

            if record.business_date > today || record.business_date < self.asset.registered_on {
                violations.push(ChainViolation::DateOutOfBounds {
                    code: record.code.clone(),
                    date: record.business_date,
                });
            }

            if let Some(previous) = self
                .predecessor(index)
                .filter(|p| record.business_date < p.business_date)
            {
                violations.push(ChainViolation::DateRegression {
                    code: record.code.clone(),
                    previous: previous.code.clone(),
                });
            }
        }

        let derived = self.current_location();
        if self.asset.location != derived {
            violations.push(ChainViolation::StaleLocation {
                cached: self.asset.location.clone(),
                derived,
            });
        }

        violations
    }
}

/// A broken invariant found by `AssetChain::audit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainViolation {
    /// The earliest record does not leave the warehouse.
    FirstNotFromWarehouse { code: MovementCode },
    /// A record does not start where its predecessor ended.
    Discontinuity {
        code: MovementCode,
        expected: Location,
        found: Location,
    },
    /// A record ends where it starts.
    NoOp { code: MovementCode },
    /// A record's direction contradicts its source and target.
    DirectionMismatch {
        code: MovementCode,
        direction: Direction,
    },
    /// A business date is in the future or before registration.
    DateOutOfBounds { code: MovementCode, date: NaiveDate },
    /// A business date is earlier than its predecessor's.
    DateRegression {
        code: MovementCode,
        previous: MovementCode,
    },
    /// The asset's cached location disagrees with its chain.
    StaleLocation { cached: Location, derived: Location },
}

impl fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstNotFromWarehouse { code } => {
                write!(f, "{}: first movement does not leave the warehouse", code)
            }
            Self::Discontinuity {
                code,
                expected,
                found,
            } => write!(f, "{}: starts at {} but previous ended at {}", code, found, expected),
            Self::NoOp { code } => write!(f, "{}: source equals target", code),
            Self::DirectionMismatch { code, direction } => {
                write!(f, "{}: direction {} contradicts its endpoints", code, direction)
            }
            Self::DateOutOfBounds { code, date } => {
                write!(f, "{}: business date {} out of bounds", code, date)
            }
            Self::DateRegression { code, previous } => {
                write!(f, "{}: business date earlier than {}", code, previous)
            }
            Self::StaleLocation { cached, derived } => {
                write!(f, "cached location {} differs from derived {}", cached, derived)
            }
        }
    }
}
