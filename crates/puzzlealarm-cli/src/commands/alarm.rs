use clap::Subcommand;
use puzzlealarm_core::{AlarmPatch, AlarmTime, RepeatPattern};

use super::{print_event, warn_failures, App, CliResult};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create an alarm
    Add {
        /// Time of day, 24-hour HH:MM
        time: AlarmTime,
        #[arg(long)]
        label: Option<String>,
        /// once, daily, weekdays, weekends or custom
        #[arg(long, default_value = "once")]
        repeat: RepeatPattern,
        /// Days for `--repeat custom`, 0 = Sunday (e.g. "1,3,5")
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        /// Create it switched off
        #[arg(long)]
        disabled: bool,
    },
    /// List alarms ordered by time
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print one alarm as JSON
    Show { id: String },
    /// Switch an alarm on or off
    Toggle { id: String },
    /// Change the time of an alarm
    SetTime { id: String, time: AlarmTime },
    /// Delete an alarm and cancel its triggers
    Delete { id: String },
    /// Show the alarm that rings next
    Next,
    /// Re-register every enabled alarm (run after a reboot)
    RescheduleAll,
}

pub fn run(action: AlarmAction) -> CliResult {
    let app = App::open()?;
    match action {
        AlarmAction::Add {
            time,
            label,
            repeat,
            days,
            disabled,
        } => {
            if !days.is_empty() && repeat != RepeatPattern::Custom {
                let message = format!("--days requires --repeat custom, got {}", repeat.as_str());
                return Err(message.into());
            }
            let mut draft = app.config.new_alarm(time).repeat(repeat).enabled(!disabled);
            if let Some(label) = label {
                draft = draft.label(label);
            }
            if !days.is_empty() {
                draft = draft.custom_days(days);
            }
            let saved = app.repo.create(draft)?;
            warn_failures(&saved.failures);
            println!("Alarm created: {}", saved.alarm.id);
        }
        AlarmAction::List { json } => {
            let alarms = app.repo.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("No alarms.");
            } else {
                for alarm in &alarms {
                    println!(
                        "{}  {}  {:<3}  {:<12}  {}",
                        alarm.id,
                        alarm.time,
                        if alarm.enabled { "on" } else { "off" },
                        alarm.repeat_label(),
                        alarm.display_label(app.config.placeholder_label()),
                    );
                }
            }
        }
        AlarmAction::Show { id } => {
            let alarm = app.repo.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&alarm)?);
        }
        AlarmAction::Toggle { id } => {
            let saved = app.repo.toggle(&id)?;
            warn_failures(&saved.failures);
            let state = if saved.alarm.enabled { "enabled" } else { "disabled" };
            println!("Alarm {id} {state}");
        }
        AlarmAction::SetTime { id, time } => {
            let saved = app.repo.update(&id, &AlarmPatch::time(time))?;
            warn_failures(&saved.failures);
            print_event(&saved.event)?;
        }
        AlarmAction::Delete { id } => {
            app.repo.delete(&id)?;
            println!("Alarm {id} deleted");
        }
        AlarmAction::Next => match app.repo.next_alarm()? {
            Some((alarm, at)) => println!(
                "{}  {}  {}",
                at.format("%Y-%m-%d %H:%M"),
                alarm.id,
                alarm.label
            ),
            None => println!("No active alarms."),
        },
        AlarmAction::RescheduleAll => {
            let recovered = app.repo.reschedule_all()?;
            warn_failures(&recovered.failures);
            println!("Rescheduled {} alarm(s)", recovered.alarms);
        }
    }
    Ok(())
}
