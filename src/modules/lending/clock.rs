use std::fmt;
use std::sync::{Mutex, PoisonError};

use time::{Date, Duration, OffsetDateTime};

/// Source of the current calendar date.
pub trait Clock: Send + Sync + fmt::Debug {
    fn today(&self) -> Date;
}

/// Wall clock, local time zone when it can be determined, UTC otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .date()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<Date>,
}

impl ManualClock {
    pub fn new(today: Date) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: Date) {
        *self.today.lock().unwrap_or_else(PoisonError::into_inner) = today;
    }

    pub fn advance_days(&self, days: i64) {
        let mut today = self.today.lock().unwrap_or_else(PoisonError::into_inner);
        *today = today.saturating_add(Duration::days(days));
    }
}

impl Clock for ManualClock {
    fn today(&self) -> Date {
        *self.today.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn manual_clock_moves_only_on_request() {
        let clock = ManualClock::new(date!(2024 - 02 - 27));
        assert_eq!(clock.today(), date!(2024 - 02 - 27));

        clock.advance_days(3);
        assert_eq!(clock.today(), date!(2024 - 03 - 01));

        clock.set(date!(2023 - 12 - 31));
        assert_eq!(clock.today(), date!(2023 - 12 - 31));
    }
}
