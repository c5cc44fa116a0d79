//! Shared wiring for integration tests: in-memory store and schedulers and a
//! fixed clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use puzzlealarm_core::{
    AlarmRepository, AlarmRinger, AlarmScheduler, FixedClock, MemoryGateway, MemoryNotifier,
    MemoryStore,
};

pub struct World {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MemoryGateway>,
    pub notifier: Arc<MemoryNotifier>,
    pub clock: Arc<FixedClock>,
    pub repo: Arc<AlarmRepository>,
    pub ringer: AlarmRinger,
}

impl World {
    pub fn at(now: NaiveDateTime) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MemoryGateway::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let clock = Arc::new(FixedClock::new(now));
        let scheduler = Arc::new(AlarmScheduler::new(
            gateway.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let repo = Arc::new(AlarmRepository::new(store.clone(), scheduler));
        let ringer = AlarmRinger::new(repo.clone(), store.clone());
        Self {
            store,
            gateway,
            notifier,
            clock,
            repo,
            ringer,
        }
    }

    /// Monday 2024-06-03, 06:00.
    pub fn monday_morning() -> Self {
        Self::at(datetime(3, 6, 0))
    }

    /// Every trigger id currently live in either scheduler.
    pub fn live_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.gateway.live().into_iter().map(|(id, _)| id).collect();
        ids.extend(self.notifier.live().into_iter().map(|(id, _, _)| id));
        ids.sort();
        ids
    }
}

impl World {
    /// Every trigger id the stored records claim, sorted like `live_ids`.
    pub fn stored_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .repo
            .list()
            .unwrap()
            .iter()
            .flat_map(|a| a.notification_ids.iter().map(|h| h.id().to_string()))
            .collect();
        ids.sort();
        ids
    }
}

/// A local time in June 2024. Treated as UTC by the fixed clock.
pub fn datetime(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn millis(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp_millis()
}
