//! Ringing and snooze state machine.
//!
//! A fired trigger opens a [`RingingSession`]. From there the user can snooze
//! or dismiss, either of which may first have to pass a challenge. The puzzle
//! itself is solved elsewhere; the host reports the outcome back through
//! [`AlarmRinger::resolve_challenge`].
//!
//! ```text
//! Idle ──fire──▶ Ringing ──snooze──▶ AwaitingSnoozeChallenge ──solved──▶ Idle
//!                  │  ▲                         │
//!                  │  └────────cancelled────────┘
//!                  └──dismiss──▶ AwaitingDismissChallenge ──solved──▶ Idle
//! ```

mod machine;
mod record;

pub use machine::{AlarmFired, AlarmRinger, ChallengeOutcome, RingState, RingingSession};
pub use record::{SnoozeRecord, SnoozeStore};
