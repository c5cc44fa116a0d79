//! Time & recurrence resolver.
//!
//! Pure functions computing when an alarm fires next, evaluated against a
//! caller-supplied local wall-clock "now". All day arithmetic moves a calendar
//! date cursor and re-applies the alarm's hour and minute; nothing here adds
//! fixed 24h durations, so a DST shift can neither skip nor double a day.
//! Mapping a local fire time to an absolute instant is the clock's job.
//!
//! ## Policy for one-shot alarms
//!
//! A `once` alarm whose time has already passed today resolves to the same
//! time tomorrow; it never resolves to `None`.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};

use crate::alarm::{Alarm, AlarmTime, RepeatPattern};

/// Occurrences materialized per repeating alarm on one-shot platforms.
pub const DEFAULT_LOOKAHEAD: usize = 7;

/// Upper bound on days scanned when materializing occurrences.
pub const SCAN_LIMIT_DAYS: u32 = 14;

/// Set of weekdays, indexed from Sunday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);
    /// Monday through Friday.
    pub const WEEKDAYS: WeekdaySet = WeekdaySet(0b011_1110);
    /// Saturday and Sunday.
    pub const WEEKENDS: WeekdaySet = WeekdaySet(0b100_0001);

    /// Indices above 6 are ignored; validation rejects them earlier.
    pub fn from_indices(days: &[u8]) -> Self {
        WeekdaySet(
            days.iter()
                .filter(|d| **d < 7)
                .fold(0u8, |acc, d| acc | (1 << d)),
        )
    }

    pub fn for_pattern(pattern: RepeatPattern, custom_days: &[u8]) -> Self {
        match pattern {
            RepeatPattern::Once => Self::EMPTY,
            RepeatPattern::Daily => Self::ALL,
            RepeatPattern::Weekdays => Self::WEEKDAYS,
            RepeatPattern::Weekends => Self::WEEKENDS,
            RepeatPattern::Custom => Self::from_indices(custom_days),
        }
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Member indices in ascending order.
    pub fn indices(self) -> Vec<u8> {
        (0..7u8).filter(|d| self.0 & (1 << d) != 0).collect()
    }
}

/// How far ahead a repeating alarm is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadWindow {
    pub occurrences: usize,
    pub scan_days: u32,
}

impl Default for LookaheadWindow {
    fn default() -> Self {
        Self {
            occurrences: DEFAULT_LOOKAHEAD,
            scan_days: SCAN_LIMIT_DAYS,
        }
    }
}

/// Next fire time strictly after `now`, or `None` when the weekday set is
/// empty.
pub fn next_occurrence(alarm: &Alarm, now: NaiveDateTime) -> Option<NaiveDateTime> {
    next_occurrence_of(alarm.time, alarm.repeat_pattern, alarm.weekday_set(), now)
}

pub fn next_occurrence_of(
    time: AlarmTime,
    pattern: RepeatPattern,
    days: WeekdaySet,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let today = now.date();
    match pattern {
        RepeatPattern::Once | RepeatPattern::Daily => {
            let candidate = at(today, time);
            if candidate > now {
                Some(candidate)
            } else {
                today.checked_add_days(Days::new(1)).map(|d| at(d, time))
            }
        }
        RepeatPattern::Weekdays | RepeatPattern::Weekends | RepeatPattern::Custom => {
            // Offset 7 covers a single-day set whose slot today already passed.
            (0..=7u64)
                .filter_map(|offset| today.checked_add_days(Days::new(offset)))
                .filter(|date| days.contains(date.weekday()))
                .map(|date| at(date, time))
                .find(|candidate| *candidate > now)
        }
    }
}

/// Up to `count` strictly increasing future fire times, scanning at most
/// [`SCAN_LIMIT_DAYS`] days. One-shot alarms yield at most one.
pub fn occurrences_within_window(
    alarm: &Alarm,
    now: NaiveDateTime,
    count: usize,
) -> Vec<NaiveDateTime> {
    occurrences_in(
        alarm,
        now,
        LookaheadWindow {
            occurrences: count,
            scan_days: SCAN_LIMIT_DAYS,
        },
    )
}

pub fn occurrences_in(
    alarm: &Alarm,
    now: NaiveDateTime,
    window: LookaheadWindow,
) -> Vec<NaiveDateTime> {
    if window.occurrences == 0 {
        return Vec::new();
    }
    if !alarm.repeat_pattern.is_repeating() {
        return next_occurrence(alarm, now).into_iter().collect();
    }

    let days = alarm.weekday_set();
    let today = now.date();
    let mut found = Vec::with_capacity(window.occurrences);
    for offset in 0..u64::from(window.scan_days) {
        if found.len() >= window.occurrences {
            break;
        }
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if !days.contains(date.weekday()) {
            continue;
        }
        let candidate = at(date, alarm.time);
        if candidate > now {
            found.push(candidate);
        }
    }
    found
}

fn at(date: NaiveDate, time: AlarmTime) -> NaiveDateTime {
    date.and_time(time.as_naive_time())
}
