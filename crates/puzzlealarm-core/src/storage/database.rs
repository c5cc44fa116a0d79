//! SQLite-based storage.
//!
//! Provides persistent storage for:
//! - Key-value store holding the alarm collection and snooze records
//! - Trigger ledger used by [`LedgerGateway`](crate::gateway::LedgerGateway)
//!   as a stand-in for the platform scheduler

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::kv::KeyValueStore;
use crate::error::PersistenceError;

/// A registration held by the trigger ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRow {
    pub id: String,
    /// `exact` or `notification`.
    pub kind: String,
    pub fire_at_ms: i64,
    pub alarm_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
}

/// SQLite database for alarm storage.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/puzzlealarm.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, PersistenceError> {
        let dir = data_dir().map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Self::open_at(&dir.join("puzzlealarm.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PersistenceError> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Unavailable("connection lock poisoned".into()))
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS triggers (
                id         TEXT PRIMARY KEY,
                kind       TEXT NOT NULL,
                fire_at_ms INTEGER NOT NULL,
                alarm_id   TEXT,
                title      TEXT,
                body       TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_triggers_fire_at ON triggers(fire_at_ms);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Insert or replace a trigger.
    pub fn put_trigger(&self, row: &TriggerRow) -> Result<(), PersistenceError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO triggers (id, kind, fire_at_ms, alarm_id, title, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.kind,
                row.fire_at_ms,
                row.alarm_id,
                row.title,
                row.body,
            ],
        )?;
        Ok(())
    }

    /// Returns whether a row was deleted.
    pub fn delete_trigger(&self, id: &str) -> Result<bool, PersistenceError> {
        let changed = self
            .conn()?
            .execute("DELETE FROM triggers WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn delete_triggers_of_kind(&self, kind: &str) -> Result<usize, PersistenceError> {
        let changed = self
            .conn()?
            .execute("DELETE FROM triggers WHERE kind = ?1", params![kind])?;
        Ok(changed)
    }

    /// All triggers, soonest first.
    pub fn triggers(&self) -> Result<Vec<TriggerRow>, PersistenceError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, fire_at_ms, alarm_id, title, body
             FROM triggers
             ORDER BY fire_at_ms, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TriggerRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                fire_at_ms: row.get(2)?,
                alarm_id: row.get(3)?,
                title: row.get(4)?,
                body: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        match self.kv_get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| PersistenceError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value)?;
        self.kv_set(key, &raw)
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.kv_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_remove("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn json_values_roundtrip_through_trait() {
        let db = Database::open_memory().unwrap();
        let value = serde_json::json!([{"id": "a", "time": "07:00"}]);
        KeyValueStore::set(&db, "@alarms", &value).unwrap();
        assert_eq!(KeyValueStore::get(&db, "@alarms").unwrap(), Some(value));
    }

    #[test]
    fn corrupt_json_is_reported_with_key() {
        let db = Database::open_memory().unwrap();
        db.kv_set("@alarms", "{not json").unwrap();
        let err = KeyValueStore::get(&db, "@alarms").unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { ref key, .. } if key == "@alarms"));
    }

    #[test]
    fn triggers_are_ordered_and_deletable() {
        let db = Database::open_memory().unwrap();
        for (id, at) in [("b_1", 200), ("b_0", 100)] {
            db.put_trigger(&TriggerRow {
                id: id.into(),
                kind: "exact".into(),
                fire_at_ms: at,
                alarm_id: Some("b".into()),
                title: None,
                body: None,
            })
            .unwrap();
        }
        let ids: Vec<String> = db.triggers().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["b_0", "b_1"]);
        assert!(db.delete_trigger("b_0").unwrap());
        assert!(!db.delete_trigger("b_0").unwrap());
    }
}
