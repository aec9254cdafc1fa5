//! # Clock Abstraction
//!
//! A single injected source of "now" for everything the data-access layer
//! stamps: history rows, document timestamps, interval-scoped codes.
//!
//! ## Why Not Call `Utc::now()` Directly?
//! Scattered `now()` calls make transactional behavior untestable - a save
//! that stamps three rows would stamp them with three different instants,
//! and tests could never assert on timestamps at all. Orchestration reads
//! the clock once per save and threads that instant through.

use chrono::{DateTime, Utc};

/// Time source interface (allows fixed clocks in tests).
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock (production).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant (tests and replays).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pins the clock to a calendar date at midnight UTC.
    ///
    /// Panics on an invalid date; callers pass literals.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let date = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .expect("valid calendar date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        FixedClock(DateTime::from_naive_utc_and_offset(date, Utc))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_fixed_clock_returns_pinned_instant() {
        let clock = FixedClock::at_date(2024, 3, 7);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().year(), 2024);
        assert_eq!(clock.now().month(), 3);
        assert_eq!(clock.now().day(), 7);
    }

    #[test]
    fn test_system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
