// Time source for date-sensitive rules
// "Is the date in the past", "days until service" and cache TTLs all read the clock through this seam

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of the current local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the host's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Pin the clock to `date` at `hour:minute`
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<Self> {
        date.and_hms_opt(hour, minute, 0).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let clock = FixedClock::at(date, 9, 30).unwrap();

        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().time().to_string(), "09:30:00");
    }

    #[test]
    fn test_fixed_clock_rejects_invalid_time() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert!(FixedClock::at(date, 25, 0).is_none());
    }
}
