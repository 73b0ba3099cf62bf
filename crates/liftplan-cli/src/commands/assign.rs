use std::path::Path;

use clap::Subcommand;
use liftplan_core::{CalendarDataProvider, InMemoryCalendarProvider};

use crate::data::{self, CliResult};

#[derive(Subcommand)]
pub enum AssignAction {
    /// Assign a worker to a task; refused when it would create a
    /// Critical conflict
    Worker {
        /// Worker id
        worker_id: i64,
        /// Task event id
        task_id: String,
        /// Crane model to pin on the assignment
        #[arg(long)]
        crane_model: Option<i64>,
        /// Write the updated schedule back to the data file
        #[arg(long)]
        write: bool,
    },
    /// Rank workers for a task, best match first
    Suggest {
        /// Task event id
        task_id: String,
        /// Required skill (repeatable); overrides the task's requirements
        #[arg(long = "skill")]
        skills: Vec<String>,
        /// Estimated hours for the ranking
        #[arg(long)]
        hours: Option<f64>,
    },
}

pub fn run(action: AssignAction, data: &Path, policy: Option<&Path>) -> CliResult<()> {
    let store = data::open_store(data, policy)?;
    let provider = InMemoryCalendarProvider::new(store);

    match action {
        AssignAction::Worker {
            worker_id,
            task_id,
            crane_model,
            write,
        } => {
            let outcome = provider.assign_worker(worker_id, &task_id, crane_model)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if write && outcome.success {
                data::save_store(data, provider.store())?;
            }
        }
        AssignAction::Suggest {
            task_id,
            skills,
            hours,
        } => {
            let suggestions = provider.suggest_assignment(&task_id, &skills, hours)?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
    }
    Ok(())
}
