//! The current year is not on the wire anywhere in the end-of-day date
//! field (bitmap `date_day` is BCD `MMDD`), so the source infers it from
//! the host clock. Injected here so tests don't depend on wall-clock time.

use chrono::{Datelike, NaiveDate};

pub trait Clock: std::fmt::Debug {
    fn current_year(&self) -> i32;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// Combines a BCD `MMDD` with `clock`'s current year. Returns `None` if the
/// month/day pair is not a valid calendar date (malformed field).
pub fn resolve_date_day(mmdd: u64, clock: &dyn Clock) -> Option<NaiveDate> {
    let month = (mmdd / 100) as u32;
    let day = (mmdd % 100) as u32;
    NaiveDate::from_ymd_opt(clock.current_year(), month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedClock(i32);
    impl Clock for FixedClock {
        fn current_year(&self) -> i32 {
            self.0
        }
    }

    #[test]
    fn resolves_mmdd_against_injected_year() {
        let clock = FixedClock(2024);
        let date = resolve_date_day(1225, &clock).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }

    #[test]
    fn invalid_mmdd_is_none() {
        let clock = FixedClock(2024);
        assert!(resolve_date_day(1332, &clock).is_none());
    }
}
