pub mod alarm;
pub mod config;
pub mod ring;
pub mod trigger;

use std::sync::Arc;

use chrono::{DateTime, Local};
use puzzlealarm_core::storage::Config;
use puzzlealarm_core::{
    AlarmRepository, AlarmRinger, AlarmScheduler, Database, Event, LedgerGateway,
    SchedulingError, SystemClock,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The core wired to the on-disk database, with the trigger ledger standing
/// in for the platform scheduler.
pub struct App {
    pub config: Config,
    pub ledger: Arc<LedgerGateway>,
    pub repo: Arc<AlarmRepository>,
    pub ringer: AlarmRinger,
}

impl App {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);
        let ledger = Arc::new(LedgerGateway::new(db.clone()));
        let scheduler = AlarmScheduler::new(ledger.clone(), ledger.clone(), Arc::new(SystemClock))
            .with_lookahead(config.lookahead());
        let repo = Arc::new(
            AlarmRepository::new(db.clone(), Arc::new(scheduler))
                .with_placeholder_label(config.placeholder_label()),
        );
        let ringer = AlarmRinger::new(repo.clone(), db);
        tracing::debug!(lookahead = ?config.lookahead(), "core opened");
        Ok(Self {
            config,
            ledger,
            repo,
            ringer,
        })
    }
}

pub fn print_event(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

pub fn warn_failures(failures: &[SchedulingError]) {
    for failure in failures {
        tracing::warn!(%failure, "partial scheduling failure");
        eprintln!("warning: {failure}");
    }
}

/// Epoch millis as local time, for display.
pub fn format_millis(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => millis.to_string(),
    }
}
