//! Keyed whole-value storage.
//!
//! Values are JSON documents read and written as a whole; there is no
//! querying and no partial update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

/// Key of the alarm collection.
pub const ALARMS_KEY: &str = "@alarms";

/// Key of the snooze record for an alarm.
pub fn snooze_key(alarm_id: &str) -> String {
    format!("snooze:{alarm_id}")
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError>;

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), PersistenceError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Read and decode `key`.
pub fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    match store.get(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| PersistenceError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write `value` under `key`.
pub fn save<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let value = serde_json::to_value(value)?;
    store.set(key, &value)
}

/// Store held in process memory.
///
/// Writes can be made to fail, to exercise persistence-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, serde_json::Value>>, PersistenceError>
    {
        self.entries
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.entries()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(load::<u32>(&store, "n").unwrap(), None);
        save(&store, "n", &3u32).unwrap();
        assert_eq!(load::<u32>(&store, "n").unwrap(), Some(3));
        store.remove("n").unwrap();
        store.remove("n").unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn failing_writes_leave_contents_unchanged() {
        let store = MemoryStore::new();
        save(&store, "n", &1u32).unwrap();
        store.set_fail_writes(true);
        assert!(save(&store, "n", &2u32).is_err());
        assert!(store.remove("n").is_err());
        assert_eq!(load::<u32>(&store, "n").unwrap(), Some(1));
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let store = MemoryStore::new();
        save(&store, "n", "text").unwrap();
        assert!(matches!(
            load::<u32>(&store, "n"),
            Err(PersistenceError::Corrupt { .. })
        ));
    }
}
