use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::alarm::PuzzleConfig;
use crate::gateway::TriggerHandle;

/// Every committed state change produces an Event.
/// Hosts render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AlarmCreated {
        alarm_id: String,
        scheduled: usize,
        failed: usize,
        at: NaiveDateTime,
    },
    AlarmUpdated {
        alarm_id: String,
        transition: ScheduleTransition,
        scheduled: usize,
        failed: usize,
        at: NaiveDateTime,
    },
    AlarmDeleted {
        alarm_id: String,
        at: NaiveDateTime,
    },
    /// Boot recovery re-materialized every enabled alarm.
    AlarmsRescheduled {
        alarms: usize,
        scheduled: usize,
        failed: usize,
        at: NaiveDateTime,
    },
    /// A live trigger fired and a ringing session opened.
    AlarmRinging {
        alarm_id: String,
        handle_id: String,
        snooze_count: u32,
        at: NaiveDateTime,
    },
    ChallengeRequested {
        alarm_id: String,
        purpose: ChallengePurpose,
        challenge: PuzzleConfig,
        at: NaiveDateTime,
    },
    /// The user backed out of a challenge; the alarm keeps ringing.
    ChallengeCancelled {
        alarm_id: String,
        purpose: ChallengePurpose,
        at: NaiveDateTime,
    },
    AlarmSnoozed {
        alarm_id: String,
        snooze_count: u32,
        duration_min: u32,
        handle: TriggerHandle,
        wake_at_ms: i64,
        at: NaiveDateTime,
    },
    AlarmDismissed {
        alarm_id: String,
        /// One-shot alarms switch themselves off on dismiss.
        disabled: bool,
        at: NaiveDateTime,
    },
}

impl Event {
    pub fn alarm_id(&self) -> Option<&str> {
        match self {
            Event::AlarmCreated { alarm_id, .. }
            | Event::AlarmUpdated { alarm_id, .. }
            | Event::AlarmDeleted { alarm_id, .. }
            | Event::AlarmRinging { alarm_id, .. }
            | Event::ChallengeRequested { alarm_id, .. }
            | Event::ChallengeCancelled { alarm_id, .. }
            | Event::AlarmSnoozed { alarm_id, .. }
            | Event::AlarmDismissed { alarm_id, .. } => Some(alarm_id),
            Event::AlarmsRescheduled { .. } => None,
        }
    }
}

/// What an update did to the live schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleTransition {
    /// enabled -> disabled: every handle cancelled
    Disabled,
    /// disabled -> enabled: fresh schedule
    Enabled,
    /// enabled -> enabled with time or recurrence changed
    Rescheduled,
    Unchanged,
}

impl ScheduleTransition {
    pub fn between(old_enabled: bool, new_enabled: bool, timing_changed: bool) -> Self {
        match (old_enabled, new_enabled) {
            (true, false) => ScheduleTransition::Disabled,
            (false, true) => ScheduleTransition::Enabled,
            (true, true) if timing_changed => ScheduleTransition::Rescheduled,
            _ => ScheduleTransition::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePurpose {
    Snooze,
    Dismiss,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn tagged_by_type() {
        let at = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let event = Event::AlarmDismissed {
            alarm_id: "a".into(),
            disabled: true,
            at,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AlarmDismissed");
        assert_eq!(json["disabled"], true);
        assert_eq!(event.alarm_id(), Some("a"));
    }

    #[test]
    fn transitions() {
        use ScheduleTransition::*;
        assert_eq!(ScheduleTransition::between(true, false, true), Disabled);
        assert_eq!(ScheduleTransition::between(false, true, false), Enabled);
        assert_eq!(ScheduleTransition::between(true, true, true), Rescheduled);
        assert_eq!(ScheduleTransition::between(true, true, false), Unchanged);
        assert_eq!(ScheduleTransition::between(false, false, true), Unchanged);
    }
}
