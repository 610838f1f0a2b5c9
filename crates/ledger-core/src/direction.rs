//! # Direction Rule Engine
//!
//! State machine over an asset's derived-before location.
//!
//! | State            | Admissible directions               |
//! |------------------|-------------------------------------|
//! | `Warehouse`      | `WarehouseToSite`                   |
//! | `Site(unit, _)`  | `SiteToSite`, `SiteToWarehouse`     |
//!
//! An asset with no prior records is always in the `Warehouse` state.

use crate::{Direction, LedgerError, Location, UnitId};

/// Admissibility rules for movement directions.
pub struct DirectionRules;

impl DirectionRules {
    /// Directions admissible from the given derived-before location.
    #[must_use]
    pub fn admissible(before: &Location) -> &'static [Direction] {
        match before {
            Location::Warehouse => &[Direction::WarehouseToSite],
            Location::Site { .. } => &[Direction::SiteToSite, Direction::SiteToWarehouse],
        }
    }

    /// Check a requested direction and an optional declared source unit.
    ///
    /// Fails with `DirectionViolation` when the direction is inadmissible
    /// and with `SourceMismatch` when a site-departing request declares a
    /// source unit other than the derived-before unit.
    pub fn admit(
        before: &Location,
        direction: Direction,
        declared_source: Option<&UnitId>,
    ) -> Result<(), LedgerError> {
        if !Self::admissible(before).contains(&direction) {
            return Err(LedgerError::DirectionViolation {
                direction,
                before: before.clone(),
            });
        }

        if direction.departs_warehouse() {
            return Ok(());
        }

        match declared_source {
            Some(declared) if Some(declared) != before.unit() => Err(LedgerError::SourceMismatch {
                declared: declared.clone(),
                expected: before.unit().cloned(),
            }),
            _ => Ok(()),
        }
    }

    /// The only structurally valid direction between two locations.
    ///
    /// Returns `None` for warehouse → warehouse, which no direction can express.
    #[must_use]
    pub fn derive(source: &Location, target: &Location) -> Option<Direction> {
        match (source.is_warehouse(), target.is_warehouse()) {
            (true, true) => None,
            (true, false) => Some(Direction::WarehouseToSite),
            (false, false) => Some(Direction::SiteToSite),
            (false, true) => Some(Direction::SiteToWarehouse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn warehouse_only_admits_outbound() {
        let before = Location::Warehouse;
        assert!(DirectionRules::admit(&before, Direction::WarehouseToSite, None).is_ok());

        for direction in [Direction::SiteToSite, Direction::SiteToWarehouse] {
            let err = DirectionRules::admit(&before, direction, None).expect_err("inadmissible");
            assert_eq!(err.kind(), ErrorKind::DirectionViolation);
        }
    }

    #[test]
    fn site_rejects_outbound_from_warehouse() {
        let before = Location::site("unit-a", "room-1");
        let err = DirectionRules::admit(&before, Direction::WarehouseToSite, None)
            .expect_err("inadmissible");
        assert_eq!(err.kind(), ErrorKind::DirectionViolation);

        assert!(DirectionRules::admit(&before, Direction::SiteToSite, None).is_ok());
        assert!(DirectionRules::admit(&before, Direction::SiteToWarehouse, None).is_ok());
    }

    #[test]
    fn declared_source_must_match_unit() {
        let before = Location::site("unit-a", "room-1");

        assert!(
            DirectionRules::admit(&before, Direction::SiteToSite, Some(&UnitId::new("unit-a")))
                .is_ok()
        );

        let err = DirectionRules::admit(
            &before,
            Direction::SiteToWarehouse,
            Some(&UnitId::new("unit-b")),
        )
        .expect_err("mismatch");
        assert_eq!(
            err,
            LedgerError::SourceMismatch {
                declared: UnitId::new("unit-b"),
                expected: Some(UnitId::new("unit-a")),
            }
        );
    }

    #[test]
    fn declared_source_is_ignored_when_leaving_warehouse() {
        let result = DirectionRules::admit(
            &Location::Warehouse,
            Direction::WarehouseToSite,
            Some(&UnitId::new("unit-a")),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn derive_covers_every_pair() {
        let w = Location::Warehouse;
        let s = Location::site("u", "s");

        assert_eq!(DirectionRules::derive(&w, &w), None);
        assert_eq!(DirectionRules::derive(&w, &s), Some(Direction::WarehouseToSite));
        assert_eq!(DirectionRules::derive(&s, &s), Some(Direction::SiteToSite));
        assert_eq!(DirectionRules::derive(&s, &w), Some(Direction::SiteToWarehouse));
    }
}
