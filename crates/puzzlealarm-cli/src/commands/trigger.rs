use clap::Subcommand;

use super::{format_millis, App, CliResult};

#[derive(Subcommand)]
pub enum TriggerAction {
    /// List pending triggers, soonest first
    List {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TriggerAction) -> CliResult {
    let app = App::open()?;
    match action {
        TriggerAction::List { json } => {
            let rows = app.ledger.pending()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No pending triggers.");
            }
            for row in rows {
                println!(
                    "{}  {:<12}  {}  {}",
                    format_millis(row.fire_at_ms),
                    row.kind,
                    row.id,
                    row.alarm_id.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}
