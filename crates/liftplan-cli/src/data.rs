//! Loading and saving the schedule data file.
//!
//! The CLI works against a plain JSON file holding the roster, the event
//! set and the loaded range. Conflicts and availability are derived on
//! every invocation and never stored.

use std::fs;
use std::path::Path;

use liftplan_core::{CalendarEvent, CapacityPolicy, DateRange, ScheduleStore, Worker};
use serde::{Deserialize, Serialize};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// On-disk schedule: roster, events and the loaded range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFile {
    pub workers: Vec<Worker>,
    pub events: Vec<CalendarEvent>,
    pub range: DateRange,
}

pub fn load(path: &Path) -> CliResult<ScheduleFile> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("cannot read schedule file '{}': {e}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save(path: &Path, file: &ScheduleFile) -> CliResult<()> {
    fs::write(path, serde_json::to_string_pretty(file)?)?;
    Ok(())
}

pub fn load_policy(path: Option<&Path>) -> CliResult<CapacityPolicy> {
    match path {
        Some(p) => {
            let raw = fs::read_to_string(p)
                .map_err(|e| format!("cannot read policy file '{}': {e}", p.display()))?;
            Ok(toml::from_str(&raw)?)
        }
        None => Ok(CapacityPolicy::default()),
    }
}

/// Build a store from the data and policy files.
pub fn open_store(data: &Path, policy: Option<&Path>) -> CliResult<ScheduleStore> {
    let file = load(data)?;
    let policy = load_policy(policy)?;
    Ok(ScheduleStore::new(
        file.workers,
        file.events,
        file.range,
        policy,
    )?)
}

/// Write the store's current state back to the data file.
///
/// Derived annotations are cleared first; they are recomputed on load.
pub fn save_store(path: &Path, store: &ScheduleStore) -> CliResult<()> {
    let mut snapshot = store.snapshot()?;
    for event in &mut snapshot.events {
        event.conflicts.clear();
        event.action_required = false;
    }
    save(
        path,
        &ScheduleFile {
            workers: store.workers()?,
            events: snapshot.events,
            range: store.loaded_range()?,
        },
    )
}
