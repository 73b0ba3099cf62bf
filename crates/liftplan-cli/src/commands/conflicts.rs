use std::path::Path;

use clap::Subcommand;
use liftplan_core::critical_conflicts;

use crate::data::{self, CliResult};

#[derive(Subcommand)]
pub enum ConflictsAction {
    /// Events carrying conflicts, with their conflict records
    List,
    /// Conflicts attached to one event
    Check {
        /// Event id
        event_id: String,
    },
    /// Events with at least one Critical conflict
    Critical,
}

pub fn run(action: ConflictsAction, data: &Path, policy: Option<&Path>) -> CliResult<()> {
    let store = data::open_store(data, policy)?;
    let snapshot = store.snapshot()?;

    match action {
        ConflictsAction::List => {
            let conflicted: Vec<_> = snapshot
                .events
                .iter()
                .filter(|e| e.has_conflicts())
                .collect();
            println!("{}", serde_json::to_string_pretty(&conflicted)?);
        }
        ConflictsAction::Check { event_id } => {
            let event = snapshot
                .events
                .iter()
                .find(|e| e.id == event_id)
                .ok_or_else(|| format!("no event with id '{event_id}'"))?;
            println!("{}", serde_json::to_string_pretty(&event.conflicts)?);
        }
        ConflictsAction::Critical => {
            let hits = critical_conflicts(&snapshot.events);
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
    }
    Ok(())
}
