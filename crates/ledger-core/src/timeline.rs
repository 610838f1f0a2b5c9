//! # Timeline Validator
//!
//! Validates a movement's business date against the calendar, the asset's
//! registration date, and the record's sequence neighbours.
//!
//! Neighbours are always found by `Sequence`, never by business date, so
//! editing a date can never reorder the chain. Checks run in a fixed order
//! and the first failure wins:
//!
//! 1. `FutureDate`
//! 2. `PredatesRegistration`
//! 3. `PrecedesPrevious`
//! 4. `FollowsNext`
//! 5. `TooOld`
//!
//! Equal dates on consecutive records are accepted (same-day movements).

use crate::primitives::DEFAULT_HISTORY_YEARS;
use crate::{LedgerError, MovementRecord};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Tunables of the ledger's validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    /// How far back a business date may reach, in years.
    pub history_years: u32,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            history_years: DEFAULT_HISTORY_YEARS,
        }
    }
}

impl LedgerPolicy {
    /// Earliest business date accepted relative to `today`.
    #[must_use]
    pub fn earliest(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_months(Months::new(self.history_years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Business-date checks for one asset.
#[derive(Debug, Clone, Copy)]
pub struct TimelineValidator {
    today: NaiveDate,
    registered_on: NaiveDate,
    earliest: NaiveDate,
}

impl TimelineValidator {
    #[must_use]
    pub fn new(today: NaiveDate, registered_on: NaiveDate, policy: &LedgerPolicy) -> Self {
        Self {
            today,
            registered_on,
            earliest: policy.earliest(today),
        }
    }

    /// Validate `date` for a record sitting between `previous` and `next`.
    pub fn check(
        &self,
        date: NaiveDate,
        previous: Option<&MovementRecord>,
        next: Option<&MovementRecord>,
    ) -> Result<(), LedgerError> {
        if date > self.today {
            return Err(LedgerError::FutureDate {
                date,
                today: self.today,
            });
        }

        if date < self.registered_on {
            return Err(LedgerError::PredatesRegistration {
                date,
                registered_on: self.registered_on,
            });
        }

        if let Some(previous) = previous.filter(|p| date < p.business_date) {
            return Err(LedgerError::PrecedesPrevious {
                date,
                previous: previous.code.clone(),
                previous_date: previous.business_date,
            });
        }

        if let Some(next) = next.filter(|n| date > n.business_date) {
            return Err(LedgerError::FollowsNext {
                date,
                next: next.code.clone(),
                next_date: next.business_date,
            });
        }

        if date < self.earliest {
            return Err(LedgerError::TooOld {
                date,
                earliest: self.earliest,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetId, Condition, Direction, ErrorKind, Location, MovementCode, Sequence};
    use chrono::Utc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn dated(seq: u64, date: NaiveDate) -> MovementRecord {
        MovementRecord {
            code: MovementCode::for_sequence(Sequence(seq)),
            asset_id: AssetId::new("asset"),
            direction: Direction::WarehouseToSite,
            source: Location::Warehouse,
            target: Location::site("u", "s"),
            condition: Condition::Good,
            business_date: date,
            sequence: Sequence(seq),
            recorded_at: Utc::now(),
            notes: None,
            processed_by: "clerk".into(),
        }
    }

    fn validator() -> TimelineValidator {
        TimelineValidator::new(day(2024, 6, 15), day(2010, 1, 1), &LedgerPolicy::default())
    }

    #[test]
    fn accepts_date_between_neighbours() {
        let prev = dated(1, day(2024, 1, 1));
        let next = dated(2, day(2024, 3, 1));
        assert!(validator().check(day(2024, 2, 1), Some(&prev), Some(&next)).is_ok());
    }

    #[test]
    fn accepts_same_day_as_neighbours() {
        let prev = dated(1, day(2024, 2, 1));
        let next = dated(2, day(2024, 2, 1));
        assert!(validator().check(day(2024, 2, 1), Some(&prev), Some(&next)).is_ok());
    }

    #[test]
    fn rejects_future_date() {
        let err = validator().check(day(2024, 6, 16), None, None).expect_err("future");
        assert_eq!(err.kind(), ErrorKind::FutureDate);
    }

    #[test]
    fn today_is_not_future() {
        assert!(validator().check(day(2024, 6, 15), None, None).is_ok());
    }

    #[test]
    fn rejects_date_before_registration() {
        let err = validator().check(day(2009, 12, 31), None, None).expect_err("early");
        assert_eq!(
            err,
            LedgerError::PredatesRegistration {
                date: day(2009, 12, 31),
                registered_on: day(2010, 1, 1),
            }
        );
    }

    #[test]
    fn rejects_date_before_previous() {
        let prev = dated(3, day(2024, 4, 1));
        let err = validator()
            .check(day(2024, 3, 31), Some(&prev), None)
            .expect_err("precedes");
        assert_eq!(
            err,
            LedgerError::PrecedesPrevious {
                date: day(2024, 3, 31),
                previous: MovementCode::new("MV-00000003"),
                previous_date: day(2024, 4, 1),
            }
        );
    }

    #[test]
    fn rejects_date_after_next() {
        let next = dated(4, day(2024, 4, 1));
        let err = validator()
            .check(day(2024, 4, 2), None, Some(&next))
            .expect_err("follows");
        assert_eq!(err.kind(), ErrorKind::FollowsNext);
    }

    #[test]
    fn rejects_date_outside_history_window() {
        let err = validator().check(day(2014, 6, 14), None, None).expect_err("old");
        assert_eq!(
            err,
            LedgerError::TooOld {
                date: day(2014, 6, 14),
                earliest: day(2014, 6, 15),
            }
        );
        assert!(validator().check(day(2014, 6, 15), None, None).is_ok());
    }

    #[test]
    fn checks_run_in_order() {
        // Both before registration and outside the window: registration wins.
        let err = validator().check(day(2005, 1, 1), None, None).expect_err("early");
        assert_eq!(err.kind(), ErrorKind::PredatesRegistration);

        // Both after next and in the future: future wins.
        let next = dated(2, day(2024, 1, 1));
        let err = validator()
            .check(day(2025, 1, 1), None, Some(&next))
            .expect_err("future");
        assert_eq!(err.kind(), ErrorKind::FutureDate);
    }

    #[test]
    fn policy_window_is_configurable() {
        let policy = LedgerPolicy { history_years: 1 };
        assert_eq!(policy.earliest(day(2024, 2, 29)), day(2023, 2, 28));
    }
}
