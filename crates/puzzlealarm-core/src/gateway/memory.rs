//! In-process schedulers with failure injection.
//!
//! They keep registrations in memory and never fire anything, which makes them
//! the test doubles for the orchestrator and the ringing state machine.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::{ExactAlarmGateway, NotificationContent, NotificationScheduler};
use crate::error::SchedulingError;

#[derive(Debug, Default)]
struct ExactState {
    live: BTreeMap<String, i64>,
    refused: HashSet<String>,
    exact_denied: bool,
    broken_cancel: bool,
}

/// Exact-alarm gateway held in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<ExactState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the exact-alarm permission being revoked.
    pub fn set_exact_allowed(&self, allowed: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.exact_denied = !allowed;
        }
    }

    /// Make scheduling of `id` fail with a refusal.
    pub fn refuse(&self, id: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.refused.insert(id.into());
        }
    }

    /// Make every cancel call fail.
    pub fn break_cancel(&self, broken: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.broken_cancel = broken;
        }
    }

    /// Live registrations as `(id, timestamp_millis)`, ordered by id.
    pub fn live(&self) -> Vec<(String, i64)> {
        self.state
            .lock()
            .map(|s| s.live.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.live.contains_key(id))
            .unwrap_or(false)
    }

    /// Drop everything, as a device reboot does.
    pub fn reboot(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.live.clear();
        }
    }
}

impl ExactAlarmGateway for MemoryGateway {
    fn schedule_exact(&self, id: &str, timestamp_millis: i64) -> Result<String, SchedulingError> {
        let mut state = self.state.lock().map_err(|_| SchedulingError::Unavailable)?;
        if state.exact_denied || state.refused.contains(id) {
            return Err(SchedulingError::ExactRefused {
                handle_id: id.to_string(),
                reason: "refused by platform".into(),
            });
        }
        state.live.insert(id.to_string(), timestamp_millis);
        Ok(id.to_string())
    }

    fn cancel(&self, id: &str) -> Result<bool, SchedulingError> {
        let mut state = self.state.lock().map_err(|_| SchedulingError::Unavailable)?;
        if state.broken_cancel {
            return Err(SchedulingError::CancelFailed {
                handle_id: id.to_string(),
                reason: "cancel unavailable".into(),
            });
        }
        Ok(state.live.remove(id).is_some())
    }

    fn can_schedule_exact(&self) -> bool {
        self.state.lock().map(|s| !s.exact_denied).unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    next_id: u64,
    live: BTreeMap<String, (NotificationContent, i64)>,
    failing: bool,
}

/// Notification scheduler held in memory. Ids are `notif-<n>`.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    state: Mutex<NotifierState>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.failing = failing;
        }
    }

    pub fn live(&self) -> Vec<(String, NotificationContent, i64)> {
        self.state
            .lock()
            .map(|s| {
                s.live
                    .iter()
                    .map(|(id, (content, at))| (id.clone(), content.clone(), *at))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.live.contains_key(id))
            .unwrap_or(false)
    }

    pub fn reboot(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.live.clear();
        }
    }
}

impl NotificationScheduler for MemoryNotifier {
    fn schedule_at(
        &self,
        content: &NotificationContent,
        timestamp_millis: i64,
    ) -> Result<String, SchedulingError> {
        let mut state = self.state.lock().map_err(|_| SchedulingError::Unavailable)?;
        if state.failing {
            return Err(SchedulingError::NotificationFailed {
                handle_id: content.alarm_id.clone(),
                reason: "notifications unavailable".into(),
            });
        }
        state.next_id += 1;
        let id = format!("notif-{}", state.next_id);
        state.live.insert(id.clone(), (content.clone(), timestamp_millis));
        Ok(id)
    }

    fn cancel(&self, id: &str) -> Result<(), SchedulingError> {
        let mut state = self.state.lock().map_err(|_| SchedulingError::Unavailable)?;
        state.live.remove(id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), SchedulingError> {
        let mut state = self.state.lock().map_err(|_| SchedulingError::Unavailable)?;
        state.live.clear();
        Ok(())
    }
}
