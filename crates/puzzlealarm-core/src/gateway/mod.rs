//! Native scheduling gateway.
//!
//! The platform's wake-up primitives are external collaborators. The core
//! talks to them through two traits:
//!
//! - [`ExactAlarmGateway`]: exact, device-waking alarms (may be refused)
//! - [`NotificationScheduler`]: plain scheduled notifications, used as the
//!   lower-reliability fallback
//!
//! Every registration is remembered as a [`TriggerHandle`] that records which
//! of the two holds it, so cancellation goes to the right place.

mod ledger;
mod memory;

pub use ledger::LedgerGateway;
pub use memory::{MemoryGateway, MemoryNotifier};

use serde::{Deserialize, Serialize};

use crate::alarm::Alarm;
use crate::error::SchedulingError;

pub trait ExactAlarmGateway: Send + Sync {
    /// Register a device-waking alarm under `id`, replacing any previous one
    /// with the same id. Returns the id the platform will report on fire.
    fn schedule_exact(&self, id: &str, timestamp_millis: i64) -> Result<String, SchedulingError>;

    /// Cancel `id`. `Ok(false)` means nothing was registered under it.
    fn cancel(&self, id: &str) -> Result<bool, SchedulingError>;

    /// Whether exact alarms are currently permitted.
    fn can_schedule_exact(&self) -> bool;
}

pub trait NotificationScheduler: Send + Sync {
    fn schedule_at(
        &self,
        content: &NotificationContent,
        timestamp_millis: i64,
    ) -> Result<String, SchedulingError>;

    /// Cancelling an unknown id is not an error.
    fn cancel(&self, id: &str) -> Result<(), SchedulingError>;

    fn cancel_all(&self) -> Result<(), SchedulingError>;
}

/// A live registration in one of the two schedulers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TriggerHandle {
    Exact(String),
    Notification(String),
}

impl TriggerHandle {
    pub fn id(&self) -> &str {
        match self {
            TriggerHandle::Exact(id) | TriggerHandle::Notification(id) => id,
        }
    }
}

/// What a fallback notification shows, plus the payload that routes a tap
/// back to the alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub alarm_id: String,
    #[serde(default)]
    pub snoozed: bool,
    #[serde(default)]
    pub snooze_count: Option<u32>,
}

impl NotificationContent {
    pub fn for_alarm(alarm: &Alarm) -> Self {
        Self {
            title: alarm.label.clone(),
            body: "Time to wake up! Solve the challenge to turn it off.".into(),
            alarm_id: alarm.id.clone(),
            snoozed: false,
            snooze_count: None,
        }
    }

    /// Content for the wake after the `snooze_count`-th snooze.
    pub fn for_snooze(alarm: &Alarm, snooze_count: u32) -> Self {
        Self {
            body: "Snoozed alarm".into(),
            snoozed: true,
            snooze_count: Some(snooze_count),
            ..Self::for_alarm(alarm)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_wire_shape() {
        let handle = TriggerHandle::Exact("a_0".into());
        assert_eq!(
            serde_json::to_value(&handle).unwrap(),
            serde_json::json!({"kind": "exact", "id": "a_0"})
        );
        assert_eq!(handle.id(), "a_0");
    }
}
