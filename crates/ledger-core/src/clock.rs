//! # Clock
//!
//! Source of "today" for the Timeline Validator and of `recorded_at`
//! timestamps. Kept behind a trait so tests can pin the calendar.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at noon of a fixed day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    day: NaiveDate,
}

impl FixedClock {
    #[must_use]
    pub const fn new(day: NaiveDate) -> Self {
        Self { day }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.day.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::hours(12)
    }

    fn today(&self) -> NaiveDate {
        self.day
    }
}
