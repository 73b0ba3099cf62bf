//! Event filtering and derived calendar queries.
//!
//! Filters are conjunctive: an event must pass every populated criterion.
//! Empty criteria match everything, so the default filter is a no-op.
//! Filtering never reorders events and never fails.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::event::{CalendarEvent, DateRange, EventPriority, EventStatus, EventType};
use crate::conflict::ConflictSeverity;

/// Criteria for narrowing a set of calendar events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventFilter {
    /// Keep only these event types; empty keeps all
    pub event_types: BTreeSet<EventType>,
    /// Case-insensitive substring match over title and description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    /// Keep only these priorities; empty keeps all
    pub priorities: BTreeSet<EventPriority>,
    /// Keep only events involving these workers; empty keeps all
    pub worker_ids: BTreeSet<i64>,
    /// Keep only events for these projects; empty keeps all
    pub project_ids: BTreeSet<i64>,
    /// Keep only events with at least one attached conflict
    pub with_conflicts_only: bool,
    /// Keep only these statuses; empty keeps all
    pub statuses: BTreeSet<EventStatus>,
    /// Keep only events whose span touches this range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl EventFilter {
    /// A filter that matches every event.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_priorities(mut self, priorities: impl IntoIterator<Item = EventPriority>) -> Self {
        self.priorities = priorities.into_iter().collect();
        self
    }

    pub fn with_workers(mut self, worker_ids: impl IntoIterator<Item = i64>) -> Self {
        self.worker_ids = worker_ids.into_iter().collect();
        self
    }

    pub fn with_projects(mut self, project_ids: impl IntoIterator<Item = i64>) -> Self {
        self.project_ids = project_ids.into_iter().collect();
        self
    }

    pub fn with_conflicts_only(mut self, only: bool) -> Self {
        self.with_conflicts_only = only;
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = EventStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Whether a single event passes every populated criterion.
    pub fn matches(&self, event: &CalendarEvent) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if let Some(ref text) = self.search_text {
            if !text.is_empty() {
                let needle = text.to_lowercase();
                let in_title = event.title.to_lowercase().contains(&needle);
                let in_description = event
                    .description
                    .as_ref()
                    .map(|d| d.to_lowercase().contains(&needle))
                    .unwrap_or(false);
                if !in_title && !in_description {
                    return false;
                }
            }
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&event.priority) {
            return false;
        }
        if !self.worker_ids.is_empty() {
            let involved = event
                .related
                .worker_id
                .map(|id| self.worker_ids.contains(&id))
                .unwrap_or(false);
            if !involved {
                return false;
            }
        }
        if !self.project_ids.is_empty() {
            let involved = event
                .related
                .project_id
                .map(|id| self.project_ids.contains(&id))
                .unwrap_or(false);
            if !involved {
                return false;
            }
        }
        if self.with_conflicts_only && !event.has_conflicts() {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&event.status) {
            return false;
        }
        if let Some(ref range) = self.date_range {
            if !event.range().overlaps(range) {
                return false;
            }
        }
        true
    }

    /// Apply the filter, preserving input order.
    pub fn apply(&self, events: &[CalendarEvent]) -> Vec<CalendarEvent> {
        events
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }
}

/// Events whose span covers the given day, in input order.
pub fn events_on(events: &[CalendarEvent], day: NaiveDate) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|e| e.range().contains(day))
        .cloned()
        .collect()
}

/// Deadlines and milestones within the horizon, soonest first.
pub fn upcoming_deadlines(
    events: &[CalendarEvent],
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<CalendarEvent> {
    let mut hits: Vec<CalendarEvent> = events
        .iter()
        .filter(|e| {
            matches!(e.event_type, EventType::Deadline | EventType::Milestone)
                && e.is_live()
                && {
                    let day = e.date.date_naive();
                    day >= today && (day - today).num_days() <= horizon_days
                }
        })
        .cloned()
        .collect();
    hits.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    hits
}

/// Events carrying at least one Critical conflict, in input order.
pub fn critical_conflicts(events: &[CalendarEvent]) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|e| {
            e.conflicts
                .iter()
                .any(|c| c.severity == ConflictSeverity::Critical)
        })
        .cloned()
        .collect()
}
