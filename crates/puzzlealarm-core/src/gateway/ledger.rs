//! SQLite-backed stand-in for the platform scheduler.
//!
//! Records every exact alarm and fallback notification in the `triggers`
//! table so hosts without a native alarm service (the CLI, desktop builds)
//! can inspect and fire them.

use std::sync::Arc;

use super::{ExactAlarmGateway, NotificationContent, NotificationScheduler};
use crate::alarm::base_alarm_id;
use crate::error::SchedulingError;
use crate::storage::{Database, TriggerRow};

pub struct LedgerGateway {
    db: Arc<Database>,
    exact_allowed: bool,
}

impl LedgerGateway {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            exact_allowed: true,
        }
    }

    /// Behave as a platform without exact-alarm permission.
    pub fn without_exact(db: Arc<Database>) -> Self {
        Self {
            db,
            exact_allowed: false,
        }
    }

    pub fn pending(&self) -> Result<Vec<TriggerRow>, SchedulingError> {
        self.db.triggers().map_err(|e| SchedulingError::NotificationFailed {
            handle_id: "*".into(),
            reason: e.to_string(),
        })
    }

    /// Remove a trigger that has fired.
    pub fn consume(&self, id: &str) -> Result<bool, SchedulingError> {
        self.db
            .delete_trigger(id)
            .map_err(|e| SchedulingError::CancelFailed {
                handle_id: id.to_string(),
                reason: e.to_string(),
            })
    }
}

impl ExactAlarmGateway for LedgerGateway {
    fn schedule_exact(&self, id: &str, timestamp_millis: i64) -> Result<String, SchedulingError> {
        if !self.exact_allowed {
            return Err(SchedulingError::ExactRefused {
                handle_id: id.to_string(),
                reason: "exact alarms not permitted".into(),
            });
        }
        self.db
            .put_trigger(&TriggerRow {
                id: id.to_string(),
                kind: "exact".into(),
                fire_at_ms: timestamp_millis,
                alarm_id: Some(base_alarm_id(id).to_string()),
                title: None,
                body: None,
            })
            .map_err(|e| SchedulingError::ExactRefused {
                handle_id: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(id.to_string())
    }

    fn cancel(&self, id: &str) -> Result<bool, SchedulingError> {
        self.consume(id)
    }

    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed
    }
}

impl NotificationScheduler for LedgerGateway {
    fn schedule_at(
        &self,
        content: &NotificationContent,
        timestamp_millis: i64,
    ) -> Result<String, SchedulingError> {
        let id = format!("notif-{}", uuid::Uuid::new_v4());
        self.db
            .put_trigger(&TriggerRow {
                id: id.clone(),
                kind: "notification".into(),
                fire_at_ms: timestamp_millis,
                alarm_id: Some(content.alarm_id.clone()),
                title: Some(content.title.clone()),
                body: Some(content.body.clone()),
            })
            .map_err(|e| SchedulingError::NotificationFailed {
                handle_id: content.alarm_id.clone(),
                reason: e.to_string(),
            })?;
        Ok(id)
    }

    fn cancel(&self, id: &str) -> Result<(), SchedulingError> {
        self.consume(id).map(|_| ())
    }

    fn cancel_all(&self) -> Result<(), SchedulingError> {
        self.db
            .delete_triggers_of_kind("notification")
            .map(|_| ())
            .map_err(|e| SchedulingError::CancelFailed {
                handle_id: "*".into(),
                reason: e.to_string(),
            })
    }
}
