use std::path::Path;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use liftplan_core::{CalendarDataProvider, DateRange, InMemoryCalendarProvider};

use crate::data::{self, CliResult};

#[derive(Subcommand)]
pub enum AvailabilityAction {
    /// Per-worker, per-day availability matrix
    Matrix {
        /// Window start; defaults to the loaded range
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Window end; defaults to the loaded range
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Restrict to these worker ids (repeatable)
        #[arg(long = "worker")]
        workers: Vec<i64>,
    },
    /// Headline counts for one day
    Summary {
        /// Reference day; defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

pub fn run(action: AvailabilityAction, data: &Path, policy: Option<&Path>) -> CliResult<()> {
    let store = data::open_store(data, policy)?;

    match action {
        AvailabilityAction::Matrix { from, to, workers } => {
            let loaded = store.loaded_range()?;
            let range = DateRange::new(
                from.unwrap_or(loaded.start),
                to.unwrap_or(loaded.end),
            );
            let provider = InMemoryCalendarProvider::new(store);
            let ids = (!workers.is_empty()).then_some(workers.as_slice());
            let matrix = provider.fetch_worker_availability(range, ids)?;
            println!("{}", serde_json::to_string_pretty(&matrix)?);
        }
        AvailabilityAction::Summary { today } => {
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let snapshot = store.snapshot()?;
            let summary = snapshot.matrix.summary(today);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
