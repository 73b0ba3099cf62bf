//! Dashboard summary over a loaded calendar range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::event::{CalendarEvent, EventPriority, EventStatus, EventType};

/// Headline counts for the loaded range.
///
/// Map keys are ordered so repeated computations serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    /// Events in the loaded range
    pub total_events: usize,
    /// Count per event type
    pub events_by_type: BTreeMap<EventType, usize>,
    /// Count per priority
    pub events_by_priority: BTreeMap<EventPriority, usize>,
    /// Total conflicts attached across all events
    pub conflict_count: usize,
    /// Events flagged as needing attention
    pub action_required_count: usize,
    /// Distinct workers with live leave covering today
    pub workers_on_leave_today: usize,
    /// Leave events not yet started
    pub pending_leave_requests: usize,
}

impl CalendarSummary {
    /// Compute the summary for a set of events.
    pub fn compute(events: &[CalendarEvent], today: NaiveDate) -> Self {
        let mut events_by_type: BTreeMap<EventType, usize> = BTreeMap::new();
        let mut events_by_priority: BTreeMap<EventPriority, usize> = BTreeMap::new();
        let mut conflict_count = 0;
        let mut action_required_count = 0;
        let mut on_leave_today: BTreeSet<i64> = BTreeSet::new();
        let mut pending_leave_requests = 0;

        for event in events {
            *events_by_type.entry(event.event_type).or_insert(0) += 1;
            *events_by_priority.entry(event.priority).or_insert(0) += 1;
            conflict_count += event.conflicts.len();
            if event.action_required {
                action_required_count += 1;
            }
            if event.event_type == EventType::Leave {
                if event.is_live() && event.range().contains(today) {
                    if let Some(worker_id) = event.related.worker_id {
                        on_leave_today.insert(worker_id);
                    }
                }
                if event.status == EventStatus::Scheduled && event.range().start > today {
                    pending_leave_requests += 1;
                }
            }
        }

        Self {
            total_events: events.len(),
            events_by_type,
            events_by_priority,
            conflict_count,
            action_required_count,
            workers_on_leave_today: on_leave_today.len(),
            pending_leave_requests,
        }
    }
}
