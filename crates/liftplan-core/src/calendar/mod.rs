//! Calendar event model, filtering and summaries.
//!
//! This module provides:
//! - The unified event model all scheduling facts normalize into
//! - Conjunctive event filters and derived calendar queries
//! - Dashboard summary aggregation over a loaded range

mod event;
mod filter;
mod summary;

pub use event::{
    CalendarEvent, DateRange, EventPriority, EventStatus, EventType, LeaveKind, RelatedEntities,
    ResourceRequirement, StatusTransitionError,
};
pub use filter::{critical_conflicts, events_on, upcoming_deadlines, EventFilter};
pub use summary::CalendarSummary;
