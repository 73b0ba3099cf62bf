use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use liftplan_core::MoveRequest;

use crate::data::{self, CliResult};

#[derive(Subcommand)]
pub enum MovesAction {
    /// Dry-run a move: report every violated rule, warnings and the
    /// conflicts the event would carry at its destination
    Validate {
        /// Event id
        event_id: String,
        /// New start, RFC 3339 (e.g. 2026-03-16T08:00:00Z)
        new_date: DateTime<Utc>,
        /// New end; omit for a single-day event
        #[arg(long)]
        end_date: Option<DateTime<Utc>>,
    },
    /// Apply a move; fails without touching the file when validation rejects it
    Apply {
        /// Event id
        event_id: String,
        /// New start, RFC 3339
        new_date: DateTime<Utc>,
        /// New end; omit for a single-day event
        #[arg(long)]
        end_date: Option<DateTime<Utc>>,
        /// Expected updatedAt stamp; the apply fails if the event changed
        #[arg(long)]
        stamp: Option<DateTime<Utc>>,
        /// Write the updated schedule back to the data file
        #[arg(long)]
        write: bool,
    },
}

pub fn run(action: MovesAction, data: &Path, policy: Option<&Path>) -> CliResult<()> {
    let store = data::open_store(data, policy)?;

    match action {
        MovesAction::Validate {
            event_id,
            new_date,
            end_date,
        } => {
            let request = build_request(event_id, new_date, end_date, None);
            let result = store.validate_move(&request)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        MovesAction::Apply {
            event_id,
            new_date,
            end_date,
            stamp,
            write,
        } => {
            let request = build_request(event_id, new_date, end_date, stamp);
            let outcome = store.apply_move(&request)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if write {
                data::save_store(data, &store)?;
            }
        }
    }
    Ok(())
}

fn build_request(
    event_id: String,
    new_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    stamp: Option<DateTime<Utc>>,
) -> MoveRequest {
    let mut request = MoveRequest::new(event_id, new_date);
    if let Some(end) = end_date {
        request = request.with_end_date(end);
    }
    if let Some(stamp) = stamp {
        request = request.with_expected_stamp(stamp);
    }
    request
}
