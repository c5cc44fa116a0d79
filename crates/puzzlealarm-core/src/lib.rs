//! # PuzzleAlarm Core Library
//!
//! This library provides the scheduling core of the PuzzleAlarm alarm clock.
//! It follows a CLI-first philosophy: every operation is available through
//! the standalone CLI binary, and the mobile UI is a thin layer over the
//! same library.
//!
//! ## Architecture
//!
//! - **Recurrence**: pure functions from an alarm and "now" to upcoming fire
//!   times, computed on local calendar days so DST shifts never double-fire
//! - **Repository**: whole-collection persistence with serialized mutations
//! - **Scheduler**: materializes alarms into platform triggers, exact first
//!   with a notification fallback
//! - **Snooze**: the ringing state machine with challenge gates
//!
//! ## Key Components
//!
//! - [`AlarmRepository`]: alarm CRUD and boot recovery
//! - [`AlarmScheduler`]: trigger registration and cancellation
//! - [`AlarmRinger`]: ringing sessions, snooze and dismiss
//! - [`ExactAlarmGateway`] / [`NotificationScheduler`]: platform seams
//! - [`Config`]: application configuration management

pub mod alarm;
pub mod clock;
pub mod error;
pub mod events;
pub mod gateway;
pub mod recurrence;
pub mod repository;
pub mod scheduler;
pub mod snooze;
pub mod storage;

pub use alarm::{
    Alarm, AlarmPatch, AlarmSettings, AlarmTime, DifficultyLevel, NewAlarm, PuzzleConfig,
    PuzzleType, RepeatPattern, SnoozeSettings, SoundRef,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{
    ConfigError, CoreError, PersistenceError, Result, SchedulingError, ValidationError,
};
pub use events::{ChallengePurpose, Event, ScheduleTransition};
pub use gateway::{
    ExactAlarmGateway, LedgerGateway, MemoryGateway, MemoryNotifier, NotificationContent,
    NotificationScheduler, TriggerHandle,
};
pub use recurrence::{next_occurrence, occurrences_within_window, LookaheadWindow, WeekdaySet};
pub use repository::{AlarmRepository, Recovered, Saved};
pub use scheduler::{AlarmScheduler, Replacement, ScheduleReport, SnoozeWake};
pub use snooze::{AlarmFired, AlarmRinger, ChallengeOutcome, RingState, RingingSession};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
