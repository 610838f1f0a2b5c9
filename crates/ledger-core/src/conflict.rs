//! # Conflict Checker
//!
//! Rejects movements that would not move the asset anywhere meaningful:
//! - a target equal to the record's own derived-before source (`NoOpMovement`)
//! - a target equal to the following record's target (`TargetConflict`),
//!   which would leave that later movement going nowhere

use crate::{LedgerError, Location, MovementRecord};

/// Structural no-op detection.
pub struct ConflictChecker;

impl ConflictChecker {
    /// Fail when the movement ends where it starts.
    pub fn no_op(before: &Location, target: &Location) -> Result<(), LedgerError> {
        if before == target {
            return Err(LedgerError::NoOpMovement {
                location: target.clone(),
            });
        }
        Ok(())
    }

    /// Fail when the following movement already ends at `target`.
    pub fn successor(
        target: &Location,
        successor: Option<&MovementRecord>,
    ) -> Result<(), LedgerError> {
        match successor {
            Some(next) if next.target == *target => Err(LedgerError::TargetConflict {
                next: next.code.clone(),
                location: target.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetId, Condition, Direction, ErrorKind, MovementCode, Sequence};
    use chrono::{NaiveDate, Utc};

    fn ending_at(target: Location) -> MovementRecord {
        MovementRecord {
            code: MovementCode::for_sequence(Sequence(9)),
            asset_id: AssetId::new("asset"),
            direction: Direction::SiteToSite,
            source: Location::site("x", "x"),
            target,
            condition: Condition::Good,
            business_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            sequence: Sequence(9),
            recorded_at: Utc::now(),
            notes: None,
            processed_by: "clerk".into(),
        }
    }

    #[test]
    fn same_site_is_no_op() {
        let here = Location::site("unit-a", "1");
        let err = ConflictChecker::no_op(&here, &here).expect_err("no-op");
        assert_eq!(err.kind(), ErrorKind::NoOpMovement);
    }

    #[test]
    fn same_unit_other_site_is_a_move() {
        assert!(
            ConflictChecker::no_op(&Location::site("unit-a", "1"), &Location::site("unit-a", "2"))
                .is_ok()
        );
    }

    #[test]
    fn successor_landing_on_same_target_conflicts() {
        let next = ending_at(Location::site("unit-b", "2"));
        let err = ConflictChecker::successor(&Location::site("unit-b", "2"), Some(&next))
            .expect_err("conflict");
        assert_eq!(
            err,
            LedgerError::TargetConflict {
                next: next.code.clone(),
                location: Location::site("unit-b", "2"),
            }
        );
    }

    #[test]
    fn no_successor_never_conflicts() {
        assert!(ConflictChecker::successor(&Location::Warehouse, None).is_ok());
    }
}
