//! Alarm scheduling orchestrator.
//!
//! Turns an alarm record into live registrations with the platform:
//! - One-shot alarms get a single registration whose handle id is the alarm id
//! - Repeating alarms get a rolling window of occurrences, `<id>_<index>`
//! - Each occurrence tries an exact alarm first and falls back to a plain
//!   notification; one failing occurrence never blocks the others
//!
//! Cancellation is best-effort and idempotent: failures are logged, never
//! returned.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::alarm::{occurrence_handle_id, snooze_handle_id, Alarm};
use crate::clock::Clock;
use crate::error::SchedulingError;
use crate::gateway::{ExactAlarmGateway, NotificationContent, NotificationScheduler, TriggerHandle};
use crate::recurrence::{occurrences_in, LookaheadWindow};

/// Result of materializing one alarm.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// Handles created, in occurrence order.
    pub handles: Vec<TriggerHandle>,
    /// One entry per occurrence for which every path failed.
    pub failures: Vec<SchedulingError>,
}

impl ScheduleReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A fresh schedule and the old registrations it supersedes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replacement {
    pub report: ScheduleReport,
    /// Old notification handles, to cancel once the new record is stored.
    pub superseded: Vec<TriggerHandle>,
}

/// A snooze wake that has been registered.
#[derive(Debug, Clone, PartialEq)]
pub struct SnoozeWake {
    pub handle: TriggerHandle,
    pub fire_at_millis: i64,
}

pub struct AlarmScheduler {
    exact: Arc<dyn ExactAlarmGateway>,
    notifier: Arc<dyn NotificationScheduler>,
    clock: Arc<dyn Clock>,
    window: LookaheadWindow,
}

impl AlarmScheduler {
    pub fn new(
        exact: Arc<dyn ExactAlarmGateway>,
        notifier: Arc<dyn NotificationScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            exact,
            notifier,
            clock,
            window: LookaheadWindow::default(),
        }
    }

    pub fn with_lookahead(mut self, window: LookaheadWindow) -> Self {
        self.window = window;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn lookahead(&self) -> LookaheadWindow {
        self.window
    }

    /// Register the upcoming occurrences of `alarm` relative to the clock.
    ///
    /// A disabled alarm schedules nothing. The caller owns the returned
    /// handles and must store them on the record.
    pub fn schedule_alarm(&self, alarm: &Alarm) -> ScheduleReport {
        self.schedule_alarm_after(alarm, self.clock.now())
    }

    /// Like [`schedule_alarm`](Self::schedule_alarm) but only considers
    /// occurrences strictly after `reference`.
    pub fn schedule_alarm_after(&self, alarm: &Alarm, reference: NaiveDateTime) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        if !alarm.enabled {
            return report;
        }

        let occurrences = occurrences_in(alarm, reference, self.window);
        if occurrences.is_empty() {
            tracing::warn!("Alarm {} has no upcoming occurrence", alarm.id);
            return report;
        }

        let content = NotificationContent::for_alarm(alarm);
        let repeating = alarm.repeat_pattern.is_repeating();
        for (index, fire_at) in occurrences.into_iter().enumerate() {
            let handle_id = if repeating {
                occurrence_handle_id(&alarm.id, index)
            } else {
                alarm.id.clone()
            };
            match self.schedule_one(&handle_id, fire_at, &content) {
                Ok(handle) => report.handles.push(handle),
                Err(err) => {
                    tracing::error!("Failed to schedule {} at {}: {}", handle_id, fire_at, err);
                    report.failures.push(err);
                }
            }
        }

        tracing::debug!(
            "Scheduled {} occurrence(s) of alarm {} ({} failed)",
            report.handles.len(),
            alarm.id,
            report.failures.len()
        );
        report
    }

    /// Cancel every handle stored on `alarm` and clear the list.
    pub fn cancel_alarm(&self, alarm: &mut Alarm) {
        let handles = std::mem::take(&mut alarm.notification_ids);
        self.cancel_handles(&handles);
    }

    /// Replace the live schedule of `alarm` with a fresh one from now.
    ///
    /// Exact handle ids are reused by the new schedule, so the old exact
    /// registrations are cancelled first. Notification ids never repeat; the
    /// old ones are returned in [`Replacement::superseded`] and stay live
    /// until the caller has stored the new handles.
    pub fn reschedule_alarm(&self, alarm: &mut Alarm) -> Replacement {
        self.reschedule_alarm_after(alarm, self.clock.now())
    }

    pub fn reschedule_alarm_after(
        &self,
        alarm: &mut Alarm,
        reference: NaiveDateTime,
    ) -> Replacement {
        let (exact, superseded): (Vec<_>, Vec<_>) = std::mem::take(&mut alarm.notification_ids)
            .into_iter()
            .partition(|h| matches!(h, TriggerHandle::Exact(_)));
        self.cancel_handles(&exact);
        let report = self.schedule_alarm_after(alarm, reference);
        alarm.notification_ids = report.handles.clone();
        Replacement { report, superseded }
    }

    /// Bring back the exact registrations listed on `stored` after a
    /// replacement that was never committed.
    ///
    /// Registrations that come back under an id the record does not list are
    /// cancelled again. Returns how many stored exact handles are live.
    pub fn restore_exact(&self, stored: &Alarm) -> usize {
        let wanted = stored
            .notification_ids
            .iter()
            .filter(|h| matches!(h, TriggerHandle::Exact(_)))
            .count();
        if wanted == 0 {
            return 0;
        }
        let report = self.schedule_alarm(stored);
        let (kept, extra): (Vec<_>, Vec<_>) = report
            .handles
            .into_iter()
            .partition(|h| {
                matches!(h, TriggerHandle::Exact(_)) && stored.notification_ids.contains(h)
            });
        self.cancel_handles(&extra);
        if kept.len() < wanted {
            tracing::warn!(
                "Restored {} of {} exact alarm(s) for {}",
                kept.len(),
                wanted,
                stored.id
            );
        }
        kept.len()
    }

    pub fn cancel_handles(&self, handles: &[TriggerHandle]) {
        for handle in handles {
            self.cancel_handle(handle);
        }
    }

    /// Cancel one registration. Unknown ids and gateway errors are logged
    /// and otherwise ignored.
    pub fn cancel_handle(&self, handle: &TriggerHandle) {
        let result = match handle {
            TriggerHandle::Exact(id) => self.exact.cancel(id).map(|found| {
                if !found {
                    tracing::debug!("Exact alarm {} was not registered", id);
                }
            }),
            TriggerHandle::Notification(id) => self.notifier.cancel(id),
        };
        if let Err(err) = result {
            tracing::warn!("Failed to cancel {}: {}", handle.id(), err);
        }
    }

    /// Register the wake for a snooze, `after` from now.
    ///
    /// The offset is added to the absolute instant, so a snooze that
    /// straddles a DST change still lasts exactly `after`.
    pub fn schedule_snooze(
        &self,
        alarm: &Alarm,
        after: Duration,
        snooze_count: u32,
    ) -> Result<SnoozeWake, SchedulingError> {
        let now = self.clock.now();
        let now_millis = self
            .clock
            .to_epoch_millis(now)
            .ok_or(SchedulingError::UnmappableTime(now))?;
        let fire_at_millis = now_millis + after.num_milliseconds();
        let wake = self.schedule_snooze_at(alarm, fire_at_millis, snooze_count)?;
        tracing::info!(
            "Snoozed alarm {} for {} min (snooze #{})",
            alarm.id,
            after.num_minutes(),
            snooze_count
        );
        Ok(wake)
    }

    /// Register the snooze wake of `alarm` at an absolute instant.
    pub fn schedule_snooze_at(
        &self,
        alarm: &Alarm,
        fire_at_millis: i64,
        snooze_count: u32,
    ) -> Result<SnoozeWake, SchedulingError> {
        let handle_id = snooze_handle_id(&alarm.id);
        let content = NotificationContent::for_snooze(alarm, snooze_count);
        let handle = self.register(&handle_id, fire_at_millis, &content)?;
        Ok(SnoozeWake {
            handle,
            fire_at_millis,
        })
    }

    fn schedule_one(
        &self,
        handle_id: &str,
        fire_at: NaiveDateTime,
        content: &NotificationContent,
    ) -> Result<TriggerHandle, SchedulingError> {
        let millis = self
            .clock
            .to_epoch_millis(fire_at)
            .ok_or(SchedulingError::UnmappableTime(fire_at))?;
        self.register(handle_id, millis, content)
    }

    /// Exact first, notification second.
    fn register(
        &self,
        handle_id: &str,
        millis: i64,
        content: &NotificationContent,
    ) -> Result<TriggerHandle, SchedulingError> {
        if self.exact.can_schedule_exact() {
            match self.exact.schedule_exact(handle_id, millis) {
                Ok(id) => return Ok(TriggerHandle::Exact(id)),
                Err(err) => {
                    tracing::warn!(
                        "Exact alarm {} refused, falling back to notification: {}",
                        handle_id,
                        err
                    );
                }
            }
        } else {
            tracing::debug!("Exact alarms not permitted, using notification for {}", handle_id);
        }

        self.notifier
            .schedule_at(content, millis)
            .map(TriggerHandle::Notification)
            .map_err(|err| SchedulingError::NotificationFailed {
                handle_id: handle_id.to_string(),
                reason: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmTime, RepeatPattern};
    use crate::clock::FixedClock;
    use crate::gateway::{MemoryGateway, MemoryNotifier};
    use chrono::{NaiveDate, Utc};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn alarm(id: &str, pattern: RepeatPattern) -> Alarm {
        let now = Utc::now();
        Alarm {
            id: id.into(),
            time: AlarmTime::new(7, 0).unwrap(),
            enabled: true,
            label: "Wake".into(),
            repeat_pattern: pattern,
            repeat_days: Vec::new(),
            settings: Default::default(),
            snooze_settings: Default::default(),
            notification_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    struct Harness {
        gateway: Arc<MemoryGateway>,
        notifier: Arc<MemoryNotifier>,
        scheduler: AlarmScheduler,
    }

    // 2024-06-01 is a Saturday.
    fn harness() -> Harness {
        let gateway = Arc::new(MemoryGateway::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let clock = Arc::new(FixedClock::new(at(1, 6, 0)));
        let scheduler = AlarmScheduler::new(gateway.clone(), notifier.clone(), clock);
        Harness {
            gateway,
            notifier,
            scheduler,
        }
    }

    #[test]
    fn one_shot_uses_alarm_id() {
        let h = harness();
        let report = h.scheduler.schedule_alarm(&alarm("a", RepeatPattern::Once));
        assert_eq!(report.handles, vec![TriggerHandle::Exact("a".into())]);
        let expected = at(1, 7, 0).and_utc().timestamp_millis();
        assert_eq!(h.gateway.live(), vec![("a".to_string(), expected)]);
    }

    #[test]
    fn daily_materializes_the_window() {
        let h = harness();
        let report = h.scheduler.schedule_alarm(&alarm("d", RepeatPattern::Daily));
        assert!(report.is_complete());
        let ids: Vec<&str> = report.handles.iter().map(TriggerHandle::id).collect();
        assert_eq!(ids, vec!["d_0", "d_1", "d_2", "d_3", "d_4", "d_5", "d_6"]);
    }

    #[test]
    fn disabled_schedules_nothing() {
        let h = harness();
        let mut a = alarm("x", RepeatPattern::Daily);
        a.enabled = false;
        assert!(h.scheduler.schedule_alarm(&a).handles.is_empty());
        assert!(h.gateway.live().is_empty());
    }

    #[test]
    fn refused_occurrence_falls_back() {
        let h = harness();
        h.gateway.refuse("d_1");
        let report = h.scheduler.schedule_alarm(&alarm("d", RepeatPattern::Daily));
        assert!(report.is_complete());
        assert!(matches!(report.handles[1], TriggerHandle::Notification(_)));
        assert_eq!(h.notifier.live().len(), 1);
        assert_eq!(h.gateway.live().len(), 6);
    }

    #[test]
    fn total_failure_is_isolated_per_occurrence() {
        let h = harness();
        h.gateway.refuse("d_2");
        h.notifier.set_failing(true);
        let report = h.scheduler.schedule_alarm(&alarm("d", RepeatPattern::Daily));
        assert_eq!(report.handles.len(), 6);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn without_permission_everything_is_a_notification() {
        let h = harness();
        h.gateway.set_exact_allowed(false);
        let report = h.scheduler.schedule_alarm(&alarm("d", RepeatPattern::Daily));
        assert!(report
            .handles
            .iter()
            .all(|handle| matches!(handle, TriggerHandle::Notification(_))));
    }

    #[test]
    fn cancel_is_idempotent() {
        let h = harness();
        let mut a = alarm("d", RepeatPattern::Daily);
        a.notification_ids = h.scheduler.schedule_alarm(&a).handles;
        let stale = a.notification_ids.clone();
        h.scheduler.cancel_alarm(&mut a);
        assert!(a.notification_ids.is_empty());
        assert!(h.gateway.live().is_empty());
        h.scheduler.cancel_handles(&stale);
        h.scheduler.cancel_alarm(&mut a);
    }

    #[test]
    fn broken_cancel_still_clears_handles() {
        let h = harness();
        let mut a = alarm("d", RepeatPattern::Daily);
        a.notification_ids = h.scheduler.schedule_alarm(&a).handles;
        h.gateway.break_cancel(true);
        h.scheduler.cancel_alarm(&mut a);
        assert!(a.notification_ids.is_empty());
    }

    #[test]
    fn reschedule_replaces_without_duplicates() {
        let h = harness();
        let mut a = alarm("d", RepeatPattern::Daily);
        h.scheduler.reschedule_alarm(&mut a);
        a.time = AlarmTime::new(8, 30).unwrap();
        let replacement = h.scheduler.reschedule_alarm(&mut a);
        assert!(replacement.superseded.is_empty());
        assert_eq!(a.notification_ids.len(), 7);
        assert_eq!(h.gateway.live().len(), 7);
        let first = h.gateway.live()[0].1;
        assert_eq!(first, at(1, 8, 30).and_utc().timestamp_millis());
    }

    #[test]
    fn reschedule_keeps_old_notifications_until_committed() {
        let h = harness();
        h.gateway.set_exact_allowed(false);
        let mut a = alarm("o", RepeatPattern::Once);
        a.notification_ids = h.scheduler.schedule_alarm(&a).handles;
        let old = a.notification_ids.clone();

        a.time = AlarmTime::new(8, 0).unwrap();
        let replacement = h.scheduler.reschedule_alarm(&mut a);
        assert_eq!(replacement.superseded, old);
        assert!(h.notifier.is_live(old[0].id()));
        assert_eq!(h.notifier.live().len(), 2);

        h.scheduler.cancel_handles(&replacement.superseded);
        assert_eq!(h.notifier.live().len(), 1);
    }

    #[test]
    fn restore_exact_brings_back_cancelled_occurrences() {
        let h = harness();
        let mut stored = alarm("d", RepeatPattern::Daily);
        stored.notification_ids = h.scheduler.schedule_alarm(&stored).handles;

        let mut draft = stored.clone();
        draft.time = AlarmTime::new(9, 0).unwrap();
        let replacement = h.scheduler.reschedule_alarm(&mut draft);
        h.scheduler.cancel_handles(&replacement.report.handles);
        assert!(h.gateway.live().is_empty());

        assert_eq!(h.scheduler.restore_exact(&stored), 7);
        let live: Vec<String> = h.gateway.live().into_iter().map(|(id, _)| id).collect();
        let ids: Vec<String> = stored.notification_ids.iter().map(|h| h.id().to_string()).collect();
        assert_eq!(live, ids);
        assert!(h.notifier.live().is_empty());
    }

    #[test]
    fn snooze_wake_is_offset_from_now() {
        let h = harness();
        let a = alarm("s", RepeatPattern::Once);
        let wake = h
            .scheduler
            .schedule_snooze(&a, Duration::minutes(5), 1)
            .unwrap();
        assert_eq!(wake.handle, TriggerHandle::Exact("s_snooze".into()));
        assert_eq!(
            wake.fire_at_millis,
            at(1, 6, 5).and_utc().timestamp_millis()
        );
    }
}
