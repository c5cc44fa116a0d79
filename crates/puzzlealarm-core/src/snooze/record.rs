use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::gateway::TriggerHandle;
use crate::storage::kv::{self, snooze_key, KeyValueStore};

/// Per-alarm snooze state, stored apart from the alarm so editing the alarm
/// keeps it and dismissing clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeRecord {
    pub count: u32,
    /// The wake registered by the latest snooze, until it fires or is
    /// cancelled.
    #[serde(default)]
    pub pending: Option<TriggerHandle>,
    /// When `pending` fires, in epoch millis.
    #[serde(default)]
    pub wake_at_ms: Option<i64>,
}

pub struct SnoozeStore {
    store: Arc<dyn KeyValueStore>,
}

impl SnoozeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The record for `alarm_id`; absent means zero snoozes.
    pub fn get(&self, alarm_id: &str) -> Result<SnoozeRecord, PersistenceError> {
        let record = kv::load::<SnoozeRecord>(self.store.as_ref(), &snooze_key(alarm_id))?;
        Ok(record.unwrap_or_default())
    }

    pub fn put(&self, alarm_id: &str, record: &SnoozeRecord) -> Result<(), PersistenceError> {
        kv::save(self.store.as_ref(), &snooze_key(alarm_id), record)
    }

    pub fn clear(&self, alarm_id: &str) -> Result<(), PersistenceError> {
        self.store.remove(&snooze_key(alarm_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn absent_means_zero() {
        let snoozes = SnoozeStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(snoozes.get("a").unwrap(), SnoozeRecord::default());

        let record = SnoozeRecord {
            count: 2,
            pending: Some(TriggerHandle::Exact("a_snooze".into())),
            wake_at_ms: Some(1_717_398_000_000),
        };
        snoozes.put("a", &record).unwrap();
        assert_eq!(snoozes.get("a").unwrap(), record);
        snoozes.clear("a").unwrap();
        assert_eq!(snoozes.get("a").unwrap().count, 0);
    }

    #[test]
    fn records_without_wake_time_still_load() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &snooze_key("a"),
                &serde_json::json!({"count": 1, "pending": {"kind": "exact", "id": "a_snooze"}}),
            )
            .unwrap();
        let record = SnoozeStore::new(store).get("a").unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.wake_at_ms, None);
    }
}
