//! Alarm repository.
//!
//! The whole collection lives under one key and is rewritten on every
//! mutation. Mutations hold a write lock for the full read-modify-write so a
//! background reschedule cannot lose a concurrent edit.
//!
//! Ordering rules keep stored handles consistent with the platform:
//! - new registrations are made before the record is written, and are
//!   cancelled again if the write fails
//! - registrations are dropped only after a write that no longer lists them
//!   has succeeded, except exact ones being replaced: their ids are reused,
//!   so they go first and are registered again if the write fails

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime, Utc};

use crate::alarm::{
    base_alarm_id, should_reschedule, validate_alarm, Alarm, AlarmPatch, NewAlarm,
};
use crate::error::{CoreError, Result, SchedulingError, ValidationError};
use crate::events::{Event, ScheduleTransition};
use crate::gateway::TriggerHandle;
use crate::recurrence::next_occurrence;
use crate::scheduler::{AlarmScheduler, Replacement, ScheduleReport};
use crate::storage::kv::{self, KeyValueStore, ALARMS_KEY};

/// A committed create or update.
#[derive(Debug, Clone)]
pub struct Saved {
    pub alarm: Alarm,
    /// Occurrences for which every scheduling path failed.
    pub failures: Vec<SchedulingError>,
    pub event: Event,
}

/// Result of boot recovery.
#[derive(Debug, Clone)]
pub struct Recovered {
    pub alarms: usize,
    pub failures: Vec<SchedulingError>,
    pub event: Event,
}

pub struct AlarmRepository {
    store: Arc<dyn KeyValueStore>,
    scheduler: Arc<AlarmScheduler>,
    placeholder_label: String,
    write_lock: Mutex<()>,
}

impl AlarmRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, scheduler: Arc<AlarmScheduler>) -> Self {
        Self {
            store,
            scheduler,
            placeholder_label: "New Alarm".into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Label given to alarms created without one.
    pub fn with_placeholder_label(mut self, label: impl Into<String>) -> Self {
        self.placeholder_label = label.into();
        self
    }

    pub fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    /// All alarms, ordered by time of day. Equal times keep insertion order.
    pub fn list(&self) -> Result<Vec<Alarm>> {
        let mut alarms = self.load_all()?;
        alarms.sort_by_key(|a| a.time);
        Ok(alarms)
    }

    pub fn find(&self, id: &str) -> Result<Option<Alarm>> {
        Ok(self.load_all()?.into_iter().find(|a| a.id == id))
    }

    pub fn get(&self, id: &str) -> Result<Alarm> {
        self.find(id)?
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }

    pub fn active(&self) -> Result<Vec<Alarm>> {
        Ok(self.list()?.into_iter().filter(|a| a.enabled).collect())
    }

    /// The enabled alarm that fires soonest, with its fire time.
    pub fn next_alarm(&self) -> Result<Option<(Alarm, NaiveDateTime)>> {
        let now = self.scheduler.clock().now();
        Ok(self
            .active()?
            .into_iter()
            .filter_map(|alarm| next_occurrence(&alarm, now).map(|at| (alarm, at)))
            .min_by_key(|(_, at)| *at))
    }

    pub fn create(&self, draft: NewAlarm) -> Result<Saved> {
        let created_at = Utc::now();
        let label = if draft.label.trim().is_empty() {
            self.placeholder_label.clone()
        } else {
            draft.label
        };
        let mut alarm = Alarm {
            id: uuid::Uuid::new_v4().to_string(),
            time: draft.time,
            enabled: draft.enabled,
            label,
            repeat_pattern: draft.repeat_pattern,
            repeat_days: draft.repeat_days,
            settings: draft.settings,
            snooze_settings: draft.snooze_settings,
            notification_ids: Vec::new(),
            created_at,
            updated_at: created_at,
        };
        validate_alarm(&alarm)?;

        let _guard = self.write_lock.lock()?;
        let mut alarms = self.load_all()?;
        let report = self.scheduler.schedule_alarm(&alarm);
        alarm.notification_ids = report.handles.clone();
        alarms.push(alarm.clone());

        if let Err(err) = self.save_all(&alarms) {
            tracing::error!("Failed to persist new alarm {}, rolling back: {}", alarm.id, err);
            self.scheduler.cancel_handles(&report.handles);
            return Err(err);
        }

        tracing::info!("Created alarm {} at {}", alarm.id, alarm.time);
        let event = Event::AlarmCreated {
            alarm_id: alarm.id.clone(),
            scheduled: report.handles.len(),
            failed: report.failures.len(),
            at: self.now(),
        };
        Ok(Saved {
            alarm,
            failures: report.failures,
            event,
        })
    }

    /// Merge `patch` into the stored record and adjust the live schedule.
    pub fn update(&self, id: &str, patch: &AlarmPatch) -> Result<Saved> {
        self.mutate(id, |_| patch.clone())
    }

    pub fn toggle(&self, id: &str) -> Result<Saved> {
        self.mutate(id, |current| AlarmPatch::enabled(!current.enabled))
    }

    pub fn delete(&self, id: &str) -> Result<Event> {
        let _guard = self.write_lock.lock()?;
        let mut alarms = self.load_all()?;
        let index = position(&alarms, id)?;
        let removed = alarms.remove(index);
        self.save_all(&alarms)?;
        self.scheduler.cancel_handles(&removed.notification_ids);

        tracing::info!("Deleted alarm {}", id);
        Ok(Event::AlarmDeleted {
            alarm_id: id.to_string(),
            at: self.now(),
        })
    }

    /// Re-materialize every enabled alarm. Run once at start-up; native
    /// registrations do not survive a reboot.
    pub fn reschedule_all(&self) -> Result<Recovered> {
        let _guard = self.write_lock.lock()?;
        let stored = self.load_all()?;
        let mut alarms = stored.clone();
        let mut created: Vec<TriggerHandle> = Vec::new();
        let mut superseded: Vec<TriggerHandle> = Vec::new();
        let mut failures = Vec::new();
        let mut count = 0;

        for alarm in alarms.iter_mut().filter(|a| a.enabled) {
            let replacement = self.scheduler.reschedule_alarm(alarm);
            created.extend(replacement.report.handles);
            failures.extend(replacement.report.failures);
            superseded.extend(replacement.superseded);
            count += 1;
        }

        if let Err(err) = self.save_all(&alarms) {
            tracing::error!("Failed to persist recovered schedule, rolling back: {}", err);
            self.scheduler.cancel_handles(&created);
            for alarm in stored.iter().filter(|a| a.enabled) {
                self.scheduler.restore_exact(alarm);
            }
            return Err(err);
        }
        self.scheduler.cancel_handles(&superseded);

        tracing::info!(
            "Rescheduled {} alarm(s), {} trigger(s), {} failure(s)",
            count,
            created.len(),
            failures.len()
        );
        let event = Event::AlarmsRescheduled {
            alarms: count,
            scheduled: created.len(),
            failed: failures.len(),
            at: self.now(),
        };
        Ok(Recovered {
            alarms: count,
            failures,
            event,
        })
    }

    /// Bookkeeping after `handle_id` fired: drop it from the record and, for
    /// repeating alarms, top the window back up past the fire time.
    pub(crate) fn record_fire(&self, alarm_id: &str, handle_id: &str) -> Result<Alarm> {
        let _guard = self.write_lock.lock()?;
        let mut alarms = self.load_all()?;
        let index = position(&alarms, alarm_id)?;
        let previous = alarms[index].clone();
        let mut alarm = previous.clone();
        alarm.notification_ids.retain(|h| h.id() != handle_id);

        let mut replacement = Replacement::default();
        let top_up = alarm.enabled && alarm.repeat_pattern.is_repeating();
        if top_up {
            // Occurrences share the time of day, so a minute past now skips
            // the one that is ringing even if the platform fired early.
            let reference = self.now() + Duration::minutes(1);
            replacement = self.scheduler.reschedule_alarm_after(&mut alarm, reference);
        }
        alarms[index] = alarm.clone();

        if let Err(err) = self.save_all(&alarms) {
            tracing::error!("Failed to record fire of {}: {}", handle_id, err);
            if top_up {
                self.rollback(&previous, &replacement.report.handles);
            }
            return Err(err);
        }
        self.scheduler.cancel_handles(&replacement.superseded);
        tracing::debug!("Recorded fire of {} for alarm {}", handle_id, alarm_id);
        Ok(alarm)
    }

    fn mutate<F>(&self, id: &str, make_patch: F) -> Result<Saved>
    where
        F: FnOnce(&Alarm) -> AlarmPatch,
    {
        let _guard = self.write_lock.lock()?;
        let mut alarms = self.load_all()?;
        let index = position(&alarms, id)?;
        let existing = alarms[index].clone();

        let patch = make_patch(&existing);
        if patch.label.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(ValidationError::LabelRequired.into());
        }
        let mut merged = patch.apply(&existing);
        merged.updated_at = Utc::now();
        validate_alarm(&merged)?;

        let transition = ScheduleTransition::between(
            existing.enabled,
            merged.enabled,
            should_reschedule(&existing, &merged),
        );
        let mut report = ScheduleReport::default();
        let mut cancel_after_commit = Vec::new();
        let replaced = matches!(
            transition,
            ScheduleTransition::Enabled | ScheduleTransition::Rescheduled
        );
        match transition {
            ScheduleTransition::Disabled => {
                cancel_after_commit = std::mem::take(&mut merged.notification_ids);
            }
            ScheduleTransition::Enabled | ScheduleTransition::Rescheduled => {
                let replacement = self.scheduler.reschedule_alarm(&mut merged);
                report = replacement.report;
                cancel_after_commit = replacement.superseded;
            }
            ScheduleTransition::Unchanged => {}
        }
        alarms[index] = merged.clone();

        if let Err(err) = self.save_all(&alarms) {
            tracing::error!("Failed to persist alarm {}, rolling back: {}", id, err);
            if replaced {
                self.rollback(&existing, &report.handles);
            }
            return Err(err);
        }
        self.scheduler.cancel_handles(&cancel_after_commit);

        tracing::info!("Updated alarm {} ({:?})", id, transition);
        let event = Event::AlarmUpdated {
            alarm_id: id.to_string(),
            transition,
            scheduled: report.handles.len(),
            failed: report.failures.len(),
            at: self.now(),
        };
        Ok(Saved {
            alarm: merged,
            failures: report.failures,
            event,
        })
    }

    /// Undo a replacement whose write did not commit.
    ///
    /// The stored record still lists its old handles. Its notifications were
    /// never cancelled; its exact alarms were and are registered again.
    fn rollback(&self, stored: &Alarm, created: &[TriggerHandle]) {
        self.scheduler.cancel_handles(created);
        self.scheduler.restore_exact(stored);
    }

    fn now(&self) -> NaiveDateTime {
        self.scheduler.clock().now()
    }

    fn load_all(&self) -> Result<Vec<Alarm>> {
        Ok(kv::load::<Vec<Alarm>>(self.store.as_ref(), ALARMS_KEY)?.unwrap_or_default())
    }

    fn save_all(&self, alarms: &[Alarm]) -> Result<()> {
        Ok(kv::save(self.store.as_ref(), ALARMS_KEY, alarms)?)
    }
}

fn position(alarms: &[Alarm], id: &str) -> Result<usize> {
    alarms
        .iter()
        .position(|a| a.id == id)
        .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
}

/// Logical alarm id for a fired trigger: the payload id when the platform
/// supplied one, otherwise the handle id with its suffix stripped.
pub fn fired_alarm_id<'a>(handle_id: &'a str, payload_alarm_id: Option<&'a str>) -> &'a str {
    payload_alarm_id.unwrap_or_else(|| base_alarm_id(handle_id))
}
