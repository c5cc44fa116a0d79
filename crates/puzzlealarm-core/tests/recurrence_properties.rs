//! Property tests for the recurrence resolver.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use proptest::prelude::*;

use puzzlealarm_core::recurrence::{next_occurrence_of, occurrences_in, LookaheadWindow};
use puzzlealarm_core::{Alarm, AlarmTime, RepeatPattern, WeekdaySet};

fn now_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (0u64..3650, 0u32..24, 0u32..60, 0u32..60).prop_map(|(day, h, m, s)| {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(day))
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    })
}

fn time_strategy() -> impl Strategy<Value = AlarmTime> {
    (0u8..24, 0u8..60).prop_map(|(h, m)| AlarmTime::new(h, m).unwrap())
}

fn days_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::btree_set(0u8..7, 1..=7).prop_map(|set| set.into_iter().collect())
}

fn alarm(time: AlarmTime, pattern: RepeatPattern, days: Vec<u8>) -> Alarm {
    let created = chrono::Utc::now();
    Alarm {
        id: "p".into(),
        time,
        enabled: true,
        label: "p".into(),
        repeat_pattern: pattern,
        repeat_days: days,
        settings: Default::default(),
        snooze_settings: Default::default(),
        notification_ids: Vec::new(),
        created_at: created,
        updated_at: created,
    }
}

fn matches_time(at: NaiveDateTime, time: AlarmTime) -> bool {
    at.hour() == u32::from(time.hour()) && at.minute() == u32::from(time.minute()) && at.second() == 0
}

proptest! {
    /// Property: a daily alarm's next fire is strictly after now, at the
    /// alarm's time of day, and less than a day away.
    #[test]
    fn prop_daily_next_is_strictly_future(now in now_strategy(), time in time_strategy()) {
        let next = next_occurrence_of(time, RepeatPattern::Daily, WeekdaySet::ALL, now).unwrap();
        prop_assert!(next > now);
        prop_assert!(matches_time(next, time));
        prop_assert!(next - now <= chrono::Duration::days(1));
    }

    /// Property: a custom alarm fires on a selected day, and no selected day
    /// before it would have done.
    #[test]
    fn prop_custom_next_is_minimal(
        now in now_strategy(),
        time in time_strategy(),
        days in days_strategy(),
    ) {
        let set = WeekdaySet::from_indices(&days);
        let next = next_occurrence_of(time, RepeatPattern::Custom, set, now).unwrap();
        prop_assert!(next > now);
        prop_assert!(matches_time(next, time));
        let weekday = next.weekday().num_days_from_sunday() as u8;
        prop_assert!(days.contains(&weekday));

        let mut date = now.date();
        while date < next.date() {
            let candidate = date.and_time(time.as_naive_time());
            let selected = days.contains(&(date.weekday().num_days_from_sunday() as u8));
            prop_assert!(!(selected && candidate > now), "missed earlier {}", candidate);
            date = date.succ_opt().unwrap();
        }
    }

    /// Property: a materialized window is strictly increasing, in the future
    /// and never longer than requested.
    #[test]
    fn prop_window_is_increasing(
        now in now_strategy(),
        time in time_strategy(),
        days in days_strategy(),
        count in 1usize..10,
    ) {
        let a = alarm(time, RepeatPattern::Custom, days.clone());
        let window = LookaheadWindow { occurrences: count, scan_days: 14 };
        let found = occurrences_in(&a, now, window);

        prop_assert!(found.len() <= count);
        prop_assert!(!found.is_empty());
        prop_assert!(found.iter().all(|at| *at > now && matches_time(*at, time)));
        prop_assert!(found.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert_eq!(Some(found[0]), puzzlealarm_core::next_occurrence(&a, now));
    }

    /// Property: one-shot alarms never materialize more than one trigger.
    #[test]
    fn prop_once_yields_one(now in now_strategy(), time in time_strategy(), count in 1usize..10) {
        let a = alarm(time, RepeatPattern::Once, Vec::new());
        let window = LookaheadWindow { occurrences: count, scan_days: 14 };
        prop_assert_eq!(occurrences_in(&a, now, window).len(), 1);
    }
}

#[test]
fn weekdays_from_saturday_morning_is_monday() {
    // 2024-06-01 is a Saturday.
    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let a = alarm(AlarmTime::new(7, 0).unwrap(), RepeatPattern::Weekdays, Vec::new());
    let next = puzzlealarm_core::next_occurrence(&a, now).unwrap();
    assert_eq!(
        next,
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    );
}

#[test]
fn once_rolls_to_tomorrow_when_passed() {
    let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let a = alarm(AlarmTime::new(6, 30).unwrap(), RepeatPattern::Once, Vec::new());

    let before = puzzlealarm_core::next_occurrence(&a, day.and_hms_opt(6, 0, 0).unwrap());
    assert_eq!(before, day.and_hms_opt(6, 30, 0));

    let after = puzzlealarm_core::next_occurrence(&a, day.and_hms_opt(7, 0, 0).unwrap());
    assert_eq!(after, day.succ_opt().unwrap().and_hms_opt(6, 30, 0));
}
