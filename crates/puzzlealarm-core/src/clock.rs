//! Wall-clock access.
//!
//! The resolver works purely in local wall-clock time; the clock supplies
//! "now" and maps a local fire time to the absolute millisecond timestamp the
//! platform scheduler expects.

use std::sync::Mutex;

use chrono::{Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Current device-local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Absolute epoch milliseconds for a local wall-clock time.
    fn to_epoch_millis(&self, local: NaiveDateTime) -> Option<i64>;
}

/// Device clock in the process's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn to_epoch_millis(&self, local: NaiveDateTime) -> Option<i64> {
        resolve_local(&Local, local)
    }
}

/// Map a local time to epoch millis in `tz`.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times inside
/// a gap (clocks going forward) move to the first valid minute after it.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<i64> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => Some(t.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp_millis()),
        LocalResult::None => (1..=180).find_map(|minutes| {
            tz.from_local_datetime(&(local + Duration::minutes(minutes)))
                .earliest()
                .map(|t| t.timestamp_millis())
        }),
    }
}

/// A clock that only moves when told to. Local time is treated as UTC.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or(NaiveDateTime::MIN)
    }

    fn to_epoch_millis(&self, local: NaiveDateTime) -> Option<i64> {
        resolve_local(&Utc, local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn fixed_clock_moves_on_demand() {
        let clock = FixedClock::new(dt(6, 0));
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), dt(6, 5));
        clock.set(dt(9, 0));
        assert_eq!(clock.now(), dt(9, 0));
        assert_eq!(
            clock.to_epoch_millis(dt(9, 0)),
            Some(dt(9, 0).and_utc().timestamp_millis())
        );
    }

    #[test]
    fn fixed_offset_maps_directly() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let millis = resolve_local(&tz, dt(7, 0)).unwrap();
        assert_eq!(millis, dt(6, 0).and_utc().timestamp_millis());
    }
}
