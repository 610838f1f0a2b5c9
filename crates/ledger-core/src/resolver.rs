//! # Location Resolver
//!
//! Derives an asset's authoritative current location from its
//! sequence-latest movement record.
//!
//! The projection is recomputed in full every time. There is no
//! incremental state, so the cached location on `Asset` can always be
//! rebuilt from the chain.

use crate::{CurrentLocation, Direction, Location, MovementRecord};

/// Projects a chain tail onto a location.
pub struct LocationResolver;

impl LocationResolver {
    /// Location implied by the latest record, or the warehouse for an empty chain.
    ///
    /// - `SiteToWarehouse` or no record → `Warehouse`
    /// - `WarehouseToSite` / `SiteToSite` → the record's target
    #[must_use]
    pub fn project(latest: Option<&MovementRecord>) -> Location {
        match latest {
            None => Location::Warehouse,
            Some(record) => match record.direction {
                Direction::SiteToWarehouse => Location::Warehouse,
                Direction::WarehouseToSite | Direction::SiteToSite => record.target.clone(),
            },
        }
    }

    /// Resolve a chain (in sequence order) to its public location shape.
    #[must_use]
    pub fn resolve(records: &[MovementRecord]) -> CurrentLocation {
        let latest = records.iter().max_by_key(|r| r.sequence);
        CurrentLocation::from(&Self::project(latest))
    }
}
