use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::record::{SnoozeRecord, SnoozeStore};
use crate::alarm::{Alarm, AlarmPatch, PuzzleConfig};
use crate::error::{CoreError, Result};
use crate::events::{ChallengePurpose, Event};
use crate::gateway::TriggerHandle;
use crate::repository::{fired_alarm_id, AlarmRepository};
use crate::storage::KeyValueStore;

/// Inbound message: the platform fired a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmFired {
    pub handle_id: String,
    /// Alarm id from the notification payload, when the trigger carried one.
    #[serde(default)]
    pub alarm_id: Option<String>,
    pub at: NaiveDateTime,
}

impl AlarmFired {
    pub fn new(handle_id: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            handle_id: handle_id.into(),
            alarm_id: None,
            at,
        }
    }

    pub fn with_alarm_id(mut self, alarm_id: impl Into<String>) -> Self {
        self.alarm_id = Some(alarm_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RingState {
    /// Not ringing: the session was snoozed or dismissed.
    Idle,
    Ringing,
    AwaitingSnoozeChallenge { challenge: PuzzleConfig },
    AwaitingDismissChallenge { challenge: PuzzleConfig },
}

impl RingState {
    fn name(&self) -> &'static str {
        match self {
            RingState::Idle => "idle",
            RingState::Ringing => "ringing",
            RingState::AwaitingSnoozeChallenge { .. } => "awaiting a snooze challenge",
            RingState::AwaitingDismissChallenge { .. } => "awaiting a dismiss challenge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    Solved,
    Cancelled,
}

/// One firing of one alarm, from the ring until snooze or dismiss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingingSession {
    alarm: Alarm,
    handle_id: String,
    snooze_count: u32,
    state: RingState,
}

impl RingingSession {
    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    /// The trigger that started this session.
    pub fn handle_id(&self) -> &str {
        &self.handle_id
    }

    pub fn snooze_count(&self) -> u32 {
        self.snooze_count
    }

    pub fn state(&self) -> RingState {
        self.state
    }

    pub fn can_snooze(&self) -> bool {
        self.snooze_count < self.alarm.snooze_settings.max_count
    }

    /// Minutes the next snooze would last.
    pub fn next_snooze_minutes(&self) -> u32 {
        self.alarm.snooze_settings.duration_after(self.snooze_count)
    }

    pub fn is_finished(&self) -> bool {
        self.state == RingState::Idle
    }
}

/// Drives ringing sessions. Background fires and interactive rings go
/// through the same entry points.
pub struct AlarmRinger {
    repository: Arc<AlarmRepository>,
    snoozes: SnoozeStore,
    lock: Mutex<()>,
}

impl AlarmRinger {
    pub fn new(repository: Arc<AlarmRepository>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repository,
            snoozes: SnoozeStore::new(store),
            lock: Mutex::new(()),
        }
    }

    pub fn snooze_count(&self, alarm_id: &str) -> Result<u32> {
        Ok(self.snoozes.get(alarm_id)?.count)
    }

    /// Handle a fired trigger.
    ///
    /// Returns `None` for triggers that no longer belong to a live schedule:
    /// unknown or disabled alarms, and handles the alarm does not list.
    pub fn on_alarm_fired(&self, fired: &AlarmFired) -> Result<Option<(RingingSession, Event)>> {
        let _guard = self.lock.lock()?;
        let alarm_id = fired_alarm_id(&fired.handle_id, fired.alarm_id.as_deref());
        let Some(alarm) = self.repository.find(alarm_id)? else {
            tracing::debug!("Ignoring {}: alarm {} no longer exists", fired.handle_id, alarm_id);
            return Ok(None);
        };
        if !alarm.enabled {
            tracing::debug!("Ignoring {}: alarm {} is disabled", fired.handle_id, alarm_id);
            return Ok(None);
        }

        let mut record = self.snoozes.get(&alarm.id)?;
        let is_snooze_wake = record
            .pending
            .as_ref()
            .is_some_and(|h| h.id() == fired.handle_id);
        let is_occurrence = alarm
            .notification_ids
            .iter()
            .any(|h| h.id() == fired.handle_id);

        let alarm = if is_snooze_wake {
            record.pending = None;
            self.snoozes.put(&alarm.id, &record)?;
            alarm
        } else if is_occurrence {
            self.repository.record_fire(&alarm.id, &fired.handle_id)?
        } else {
            tracing::debug!("Ignoring stale trigger {}", fired.handle_id);
            return Ok(None);
        };

        tracing::info!("Alarm {} ringing ({})", alarm.id, fired.handle_id);
        Ok(Some(open_session(alarm, &fired.handle_id, record.count, fired.at)))
    }

    /// Open a session for `alarm_id` without a fired trigger, as a preview
    /// or test ring does.
    pub fn ring(&self, alarm_id: &str) -> Result<(RingingSession, Event)> {
        let _guard = self.lock.lock()?;
        let alarm = self.repository.get(alarm_id)?;
        let count = self.snoozes.get(alarm_id)?.count;
        let now = self.now();
        Ok(open_session(alarm, alarm_id, count, now))
    }

    pub fn request_snooze(&self, session: &mut RingingSession) -> Result<Event> {
        expect_ringing(session, "snooze")?;
        let _guard = self.lock.lock()?;
        let record = self.snoozes.get(&session.alarm.id)?;
        session.snooze_count = record.count;
        check_limit(session, record.count)?;

        let settings = &session.alarm.snooze_settings;
        if let Some(challenge) = settings.active_challenge() {
            let challenge = if settings.progressive_difficulty {
                challenge.escalated(record.count)
            } else {
                *challenge
            };
            session.state = RingState::AwaitingSnoozeChallenge { challenge };
            tracing::debug!("Snooze of {} gated by {:?}", session.alarm.id, challenge);
            return Ok(Event::ChallengeRequested {
                alarm_id: session.alarm.id.clone(),
                purpose: ChallengePurpose::Snooze,
                challenge,
                at: self.now(),
            });
        }

        self.snooze_now(session, record)
    }

    pub fn request_dismiss(&self, session: &mut RingingSession) -> Result<Event> {
        expect_ringing(session, "dismiss")?;
        let _guard = self.lock.lock()?;

        if let Some(challenge) = session.alarm.settings.active_dismiss_challenge() {
            let challenge = *challenge;
            session.state = RingState::AwaitingDismissChallenge { challenge };
            return Ok(Event::ChallengeRequested {
                alarm_id: session.alarm.id.clone(),
                purpose: ChallengePurpose::Dismiss,
                challenge,
                at: self.now(),
            });
        }

        self.dismiss_now(session)
    }

    /// Report how the pending challenge ended. A cancelled challenge, or a
    /// solved one whose follow-up fails, leaves the alarm ringing.
    pub fn resolve_challenge(
        &self,
        session: &mut RingingSession,
        outcome: ChallengeOutcome,
    ) -> Result<Event> {
        let purpose = match session.state {
            RingState::AwaitingSnoozeChallenge { .. } => ChallengePurpose::Snooze,
            RingState::AwaitingDismissChallenge { .. } => ChallengePurpose::Dismiss,
            other => {
                return Err(CoreError::InvalidTransition {
                    action: "resolve a challenge",
                    state: other.name(),
                })
            }
        };
        let _guard = self.lock.lock()?;

        if outcome == ChallengeOutcome::Cancelled {
            session.state = RingState::Ringing;
            return Ok(Event::ChallengeCancelled {
                alarm_id: session.alarm.id.clone(),
                purpose,
                at: self.now(),
            });
        }

        let result = match purpose {
            ChallengePurpose::Snooze => self.snooze_after_challenge(session),
            ChallengePurpose::Dismiss => self.dismiss_now(session),
        };
        if result.is_err() {
            session.state = RingState::Ringing;
        }
        result
    }

    fn snooze_after_challenge(&self, session: &mut RingingSession) -> Result<Event> {
        let record = self.snoozes.get(&session.alarm.id)?;
        session.snooze_count = record.count;
        check_limit(session, record.count)?;
        self.snooze_now(session, record)
    }

    /// Register the wake and bump the counter as one step: if the counter
    /// cannot be written the wake is cancelled again, and a pending wake it
    /// replaced under the same id is registered anew.
    fn snooze_now(&self, session: &mut RingingSession, record: SnoozeRecord) -> Result<Event> {
        let scheduler = self.repository.scheduler();
        let minutes = session.alarm.snooze_settings.duration_after(record.count);
        let count = record.count + 1;
        let wake = scheduler.schedule_snooze(
            &session.alarm,
            Duration::minutes(i64::from(minutes)),
            count,
        )?;

        let next = SnoozeRecord {
            count,
            pending: Some(wake.handle.clone()),
            wake_at_ms: Some(wake.fire_at_millis),
        };
        if let Err(err) = self.snoozes.put(&session.alarm.id, &next) {
            tracing::error!(
                "Failed to record snooze of {}, cancelling wake: {}",
                session.alarm.id,
                err
            );
            scheduler.cancel_handle(&wake.handle);
            self.restore_pending(&session.alarm, &record, &wake.handle);
            return Err(err.into());
        }
        if let Some(previous) = record.pending.filter(|p| *p != wake.handle) {
            scheduler.cancel_handle(&previous);
        }

        session.snooze_count = count;
        session.state = RingState::Idle;
        Ok(Event::AlarmSnoozed {
            alarm_id: session.alarm.id.clone(),
            snooze_count: count,
            duration_min: minutes,
            handle: wake.handle,
            wake_at_ms: wake.fire_at_millis,
            at: self.now(),
        })
    }

    fn restore_pending(
        &self,
        alarm: &Alarm,
        record: &SnoozeRecord,
        replaced_by: &TriggerHandle,
    ) {
        let (Some(previous), Some(at)) = (&record.pending, record.wake_at_ms) else {
            return;
        };
        if previous != replaced_by {
            return;
        }
        let scheduler = self.repository.scheduler();
        match scheduler.schedule_snooze_at(alarm, at, record.count) {
            Ok(restored) if restored.handle == *previous => {
                tracing::debug!("Restored pending snooze wake {}", previous.id());
            }
            Ok(other) => {
                tracing::warn!(
                    "Pending snooze wake {} came back as {:?}",
                    previous.id(),
                    other.handle
                );
                scheduler.cancel_handle(&other.handle);
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to restore pending snooze wake {}: {}",
                    previous.id(),
                    err
                );
            }
        }
    }

    fn dismiss_now(&self, session: &mut RingingSession) -> Result<Event> {
        let alarm_id = session.alarm.id.clone();
        let record = self.snoozes.get(&alarm_id)?;

        let mut disabled = false;
        if !session.alarm.repeat_pattern.is_repeating() {
            match self.repository.update(&alarm_id, &AlarmPatch::enabled(false)) {
                Ok(saved) => {
                    session.alarm = saved.alarm;
                    disabled = true;
                }
                Err(CoreError::NotFound { .. }) => {
                    tracing::debug!("Alarm {} was deleted while ringing", alarm_id);
                }
                Err(err) => return Err(err),
            }
        }

        self.snoozes.clear(&alarm_id)?;
        if let Some(pending) = &record.pending {
            self.repository.scheduler().cancel_handle(pending);
        }

        session.snooze_count = 0;
        session.state = RingState::Idle;
        tracing::info!("Dismissed alarm {}", alarm_id);
        Ok(Event::AlarmDismissed {
            alarm_id,
            disabled,
            at: self.now(),
        })
    }

    fn now(&self) -> NaiveDateTime {
        self.repository.scheduler().clock().now()
    }
}

fn open_session(
    alarm: Alarm,
    handle_id: &str,
    snooze_count: u32,
    at: NaiveDateTime,
) -> (RingingSession, Event) {
    let event = Event::AlarmRinging {
        alarm_id: alarm.id.clone(),
        handle_id: handle_id.to_string(),
        snooze_count,
        at,
    };
    let session = RingingSession {
        alarm,
        handle_id: handle_id.to_string(),
        snooze_count,
        state: RingState::Ringing,
    };
    (session, event)
}

fn expect_ringing(session: &RingingSession, action: &'static str) -> Result<()> {
    if session.state == RingState::Ringing {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            action,
            state: session.state.name(),
        })
    }
}

fn check_limit(session: &RingingSession, count: u32) -> Result<()> {
    let max = session.alarm.snooze_settings.max_count;
    if count >= max {
        return Err(CoreError::SnoozeLimitReached { count, max });
    }
    Ok(())
}
