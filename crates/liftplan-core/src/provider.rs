//! The data-provider boundary.
//!
//! `CalendarDataProvider` is the contract a persistence or transport layer
//! implements to feed the scheduling engine:
//!
//! - Bulk and targeted reads (`fetch_events`, `fetch_worker_availability`)
//! - Event creation with server-assigned ids (`create_event`)
//! - The commit side of rescheduling (`commit_move`)
//! - Worker assignment with conflict screening (`assign_worker`,
//!   `suggest_assignment`)
//!
//! `InMemoryCalendarProvider` implements the contract over a
//! [`ScheduleStore`] and is what the CLI and the test suites run against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{AssignmentAdvisor, AssignmentSuggestion};
use crate::availability::{AvailabilityAggregator, AvailabilityMatrix};
use crate::calendar::{
    CalendarEvent, CalendarSummary, DateRange, EventFilter, EventPriority, EventType, LeaveKind,
    RelatedEntities, ResourceRequirement,
};
use crate::conflict::ConflictInfo;
use crate::error::{CoreError, Result};
use crate::reschedule::{MoveRequest, ScheduleStore};
use crate::roster::Worker;

/// Parameters for a bulk calendar read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub range: DateRange,
    /// Restrict to these event types; `None` fetches everything
    #[serde(default)]
    pub event_types: Option<Vec<EventType>>,
    /// Attach detected conflicts to each returned event
    #[serde(default = "default_true")]
    pub include_conflicts: bool,
    /// Include the availability matrix alongside the events
    #[serde(default)]
    pub include_metadata: bool,
}

fn default_true() -> bool {
    true
}

impl FetchRequest {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            event_types: None,
            include_conflicts: true,
            include_metadata: false,
        }
    }

    pub fn with_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = Some(types.into_iter().collect());
        self
    }

    pub fn with_conflicts(mut self, include: bool) -> Self {
        self.include_conflicts = include;
        self
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

/// One bulk read: events in range plus the derived surfaces.
///
/// The summary always covers the returned events and is computed before
/// any conflict stripping, so its counts stay truthful even when the
/// caller asked for slim event payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarBundle {
    pub events: Vec<CalendarEvent>,
    pub availability: Option<AvailabilityMatrix>,
    pub summary: CalendarSummary,
    pub last_updated: DateTime<Utc>,
}

/// A new event before the provider assigns it an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: EventPriority,
    #[serde(default)]
    pub related: RelatedEntities,
    #[serde(default)]
    pub resource_requirements: Vec<ResourceRequirement>,
    #[serde(default)]
    pub leave_kind: Option<LeaveKind>,
    #[serde(default)]
    pub half_day: bool,
}

impl EventDraft {
    pub fn new(event_type: EventType, title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            event_type,
            title: title.into(),
            description: None,
            date,
            end_date: None,
            priority: EventPriority::default(),
            related: RelatedEntities::default(),
            resource_requirements: Vec::new(),
            leave_kind: None,
            half_day: false,
        }
    }

    /// Turn the draft into a full event under the given id.
    ///
    /// Fails with `InvalidEventWindow` when the end date precedes the
    /// start date.
    pub fn materialize(self, id: impl Into<String>) -> Result<CalendarEvent> {
        let mut event =
            CalendarEvent::try_new(id, self.event_type, self.title, self.date, self.end_date)?;
        event.description = self.description;
        event.priority = self.priority;
        event.related = self.related;
        event.resource_requirements = self.resource_requirements;
        event.leave_kind = self.leave_kind;
        event.half_day = self.half_day;
        Ok(event)
    }
}

/// Outcome of an assignment attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub success: bool,
    pub conflicts: Vec<ConflictInfo>,
}

/// Contract between the scheduling engine and whatever holds the data.
///
/// Implementations must be safe to share across threads; the engine calls
/// them from wherever a refresh or a commit happens to run.
pub trait CalendarDataProvider: Send + Sync {
    /// Bulk read of events in a range, with optional derived surfaces.
    fn fetch_events(&self, request: &FetchRequest) -> Result<CalendarBundle>;

    /// Targeted availability read, optionally narrowed to specific workers.
    fn fetch_worker_availability(
        &self,
        range: DateRange,
        worker_ids: Option<&[i64]>,
    ) -> Result<AvailabilityMatrix>;

    /// Create an event from a draft, assigning it a fresh id.
    fn create_event(&self, draft: EventDraft) -> Result<CalendarEvent>;

    /// Persist a validated move and return the updated event.
    ///
    /// Implementations must re-validate as part of the commit; a request
    /// that passed a dry run earlier can still be rejected here.
    fn commit_move(&self, request: &MoveRequest) -> Result<CalendarEvent>;

    /// Assign a worker to a task, optionally pinning a crane model.
    ///
    /// Critical conflicts refuse the assignment; the outcome reports
    /// `success: false` with the conflicts that blocked it.
    fn assign_worker(
        &self,
        worker_id: i64,
        task_id: &str,
        crane_model_id: Option<i64>,
    ) -> Result<AssignmentOutcome>;

    /// Rank workers for a task, best match first.
    ///
    /// Non-empty `required_skills` or a given `estimated_hours` override
    /// the requirements stored on the task for the ranking.
    fn suggest_assignment(
        &self,
        task_id: &str,
        required_skills: &[String],
        estimated_hours: Option<f64>,
    ) -> Result<Vec<AssignmentSuggestion>>;
}

/// Provider over an in-process [`ScheduleStore`].
pub struct InMemoryCalendarProvider {
    store: ScheduleStore,
}

impl InMemoryCalendarProvider {
    pub fn new(store: ScheduleStore) -> Self {
        Self { store }
    }

    /// The store behind this provider.
    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    fn select_workers(workers: Vec<Worker>, worker_ids: Option<&[i64]>) -> Vec<Worker> {
        match worker_ids {
            Some(ids) => workers.into_iter().filter(|w| ids.contains(&w.id)).collect(),
            None => workers,
        }
    }
}

impl CalendarDataProvider for InMemoryCalendarProvider {
    fn fetch_events(&self, request: &FetchRequest) -> Result<CalendarBundle> {
        let snapshot = self.store.snapshot()?;

        let mut filter = EventFilter::new().with_date_range(request.range);
        if let Some(types) = &request.event_types {
            filter = filter.with_event_types(types.iter().copied());
        }
        let mut events = filter.apply(&snapshot.events);
        let summary = CalendarSummary::compute(&events, snapshot.as_of.date_naive());
        if !request.include_conflicts {
            for event in &mut events {
                event.conflicts.clear();
            }
        }

        let availability = if request.include_metadata {
            let workers = self.store.workers()?;
            Some(
                AvailabilityAggregator::new(self.store.policy().clone()).compute(
                    &workers,
                    &snapshot.events,
                    request.range,
                )?,
            )
        } else {
            None
        };

        Ok(CalendarBundle {
            events,
            availability,
            summary,
            last_updated: snapshot.as_of,
        })
    }

    fn fetch_worker_availability(
        &self,
        range: DateRange,
        worker_ids: Option<&[i64]>,
    ) -> Result<AvailabilityMatrix> {
        let workers = Self::select_workers(self.store.workers()?, worker_ids);
        let events = self.store.snapshot()?.events;
        AvailabilityAggregator::new(self.store.policy().clone()).compute(&workers, &events, range)
    }

    fn create_event(&self, draft: EventDraft) -> Result<CalendarEvent> {
        let id = Uuid::new_v4().to_string();
        let event = draft.materialize(id.clone())?;
        self.store.insert_event(event)?;
        let snapshot = self.store.snapshot()?;
        snapshot
            .events
            .into_iter()
            .find(|e| e.id == id)
            .ok_or(CoreError::NotFound {
                entity: "event",
                id,
            })
    }

    fn commit_move(&self, request: &MoveRequest) -> Result<CalendarEvent> {
        Ok(self.store.apply_move(request)?.event)
    }

    fn assign_worker(
        &self,
        worker_id: i64,
        task_id: &str,
        crane_model_id: Option<i64>,
    ) -> Result<AssignmentOutcome> {
        let decision = self.store.assign_worker(worker_id, task_id, crane_model_id)?;
        Ok(AssignmentOutcome {
            success: decision.committed,
            conflicts: decision.conflicts,
        })
    }

    fn suggest_assignment(
        &self,
        task_id: &str,
        required_skills: &[String],
        estimated_hours: Option<f64>,
    ) -> Result<Vec<AssignmentSuggestion>> {
        let workers = self.store.workers()?;
        let mut events = self.store.snapshot()?.events;
        let index = events
            .iter()
            .position(|e| e.id == task_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: task_id.to_string(),
            })?;

        if !required_skills.is_empty() || estimated_hours.is_some() {
            events[index].resource_requirements =
                overlay_requirements(required_skills, estimated_hours);
        }

        AssignmentAdvisor::new(self.store.policy().clone()).suggest(&workers, &events, task_id)
    }
}

/// Requirements supplied at call time instead of read off the task.
///
/// Hours are spread evenly across the named skills; with no skills the
/// hours stand alone as a single skill-less requirement.
fn overlay_requirements(
    required_skills: &[String],
    estimated_hours: Option<f64>,
) -> Vec<ResourceRequirement> {
    if required_skills.is_empty() {
        return vec![ResourceRequirement {
            skill_type: None,
            certification_required: false,
            worker_count: 1,
            estimated_hours,
        }];
    }
    let per_skill = estimated_hours.map(|h| h / required_skills.len() as f64);
    required_skills
        .iter()
        .map(|skill| ResourceRequirement {
            skill_type: Some(skill.clone()),
            certification_required: false,
            worker_count: 1,
            estimated_hours: per_skill,
        })
        .collect()
}
