use std::path::Path;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use liftplan_core::{
    upcoming_deadlines, CalendarSummary, DateRange, EventFilter, EventPriority, EventStatus,
    EventType,
};

use crate::data::{self, CliResult};

#[derive(Subcommand)]
pub enum EventsAction {
    /// List events in the loaded range, conflicts attached
    List {
        /// Filter by event type (repeatable)
        #[arg(long = "type", value_parser = super::parse_event_type)]
        event_types: Vec<EventType>,
        /// Case-insensitive search over titles and descriptions
        #[arg(long)]
        search: Option<String>,
        /// Filter by priority (repeatable)
        #[arg(long, value_parser = super::parse_priority)]
        priority: Vec<EventPriority>,
        /// Filter by worker id (repeatable)
        #[arg(long = "worker")]
        workers: Vec<i64>,
        /// Filter by project id (repeatable)
        #[arg(long = "project")]
        projects: Vec<i64>,
        /// Filter by status (repeatable)
        #[arg(long, value_parser = super::parse_status)]
        status: Vec<EventStatus>,
        /// Only events carrying conflicts
        #[arg(long)]
        conflicts_only: bool,
        /// Restrict to events overlapping this window start
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Restrict to events overlapping this window end
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Dashboard summary over the loaded range
    Summary {
        /// Reference day; defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Deadlines and milestones coming up
    Deadlines {
        /// Days ahead to look
        #[arg(long, default_value_t = 14)]
        horizon: i64,
        /// Reference day; defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

pub fn run(action: EventsAction, data: &Path, policy: Option<&Path>) -> CliResult<()> {
    let store = data::open_store(data, policy)?;
    let snapshot = store.snapshot()?;

    match action {
        EventsAction::List {
            event_types,
            search,
            priority,
            workers,
            projects,
            status,
            conflicts_only,
            from,
            to,
        } => {
            let mut filter = EventFilter::new();
            if !event_types.is_empty() {
                filter = filter.with_event_types(event_types);
            }
            if let Some(text) = search {
                filter = filter.with_search_text(text);
            }
            if !priority.is_empty() {
                filter = filter.with_priorities(priority);
            }
            if !workers.is_empty() {
                filter = filter.with_workers(workers);
            }
            if !projects.is_empty() {
                filter = filter.with_projects(projects);
            }
            if !status.is_empty() {
                filter = filter.with_statuses(status);
            }
            if conflicts_only {
                filter = filter.with_conflicts_only(true);
            }
            if from.is_some() || to.is_some() {
                let loaded = store.loaded_range()?;
                let range = DateRange::new(
                    from.unwrap_or(loaded.start),
                    to.unwrap_or(loaded.end),
                );
                filter = filter.with_date_range(range);
            }
            let events = filter.apply(&snapshot.events);
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        EventsAction::Summary { today } => {
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let summary = CalendarSummary::compute(&snapshot.events, today);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        EventsAction::Deadlines { horizon, today } => {
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let deadlines = upcoming_deadlines(&snapshot.events, today, horizon);
            println!("{}", serde_json::to_string_pretty(&deadlines)?);
        }
    }
    Ok(())
}
