use clap::{Args, ValueEnum};
use puzzlealarm_core::{AlarmFired, ChallengeOutcome, Clock, RingState, SystemClock};

use super::{print_event, App, CliResult};

#[derive(Args)]
pub struct RingArgs {
    /// Trigger id as shown by `trigger list`
    handle: String,
    action: RingAction,
    /// Treat any challenge as solved
    #[arg(long)]
    solved: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RingAction {
    Snooze,
    Dismiss,
}

/// Fire `handle` as the platform would, then snooze or dismiss.
///
/// Events are printed one JSON object per line.
pub fn run(args: RingArgs) -> CliResult {
    let app = App::open()?;
    let row = app
        .ledger
        .pending()?
        .into_iter()
        .find(|row| row.id == args.handle);
    // A fired trigger is gone from the platform whatever happens next.
    app.ledger.consume(&args.handle)?;

    let mut fired = AlarmFired::new(args.handle.clone(), SystemClock.now());
    if let Some(alarm_id) = row.and_then(|row| row.alarm_id) {
        fired = fired.with_alarm_id(alarm_id);
    }
    let Some((mut session, event)) = app.ringer.on_alarm_fired(&fired)? else {
        println!("Trigger {} is stale; nothing rang.", args.handle);
        return Ok(());
    };
    print_event(&event)?;

    let event = match args.action {
        RingAction::Snooze => app.ringer.request_snooze(&mut session)?,
        RingAction::Dismiss => app.ringer.request_dismiss(&mut session)?,
    };
    print_event(&event)?;

    if matches!(
        session.state(),
        RingState::AwaitingSnoozeChallenge { .. } | RingState::AwaitingDismissChallenge { .. }
    ) {
        if !args.solved {
            return Err("challenge required; rerun with --solved".into());
        }
        let event = app
            .ringer
            .resolve_challenge(&mut session, ChallengeOutcome::Solved)?;
        print_event(&event)?;
    }
    Ok(())
}
