//! Unified calendar event model.
//!
//! Every scheduling fact the engine reasons about is one `CalendarEvent`:
//! approved leave, project phases, operator task assignments, milestones,
//! equipment bookings, maintenance windows, deadlines and published work
//! plans. Heterogeneous sources normalize into this one shape so the
//! availability and conflict layers have a single input.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictInfo;
use crate::error::DataIntegrityError;

/// Kind of scheduling fact an event represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Approved worker leave
    Leave,
    /// Project phase spanning its start to end date
    Project,
    /// A concrete task, usually with operators assigned
    Task,
    /// Project milestone
    Milestone,
    /// Worker-to-task resource assignment
    Resource,
    /// Equipment maintenance window
    Maintenance,
    /// Hard deadline
    Deadline,
    /// Published weekly work plan
    WorkPlan,
}

impl EventType {
    /// All event types, in wire order.
    pub const ALL: [EventType; 8] = [
        EventType::Leave,
        EventType::Project,
        EventType::Task,
        EventType::Milestone,
        EventType::Resource,
        EventType::Maintenance,
        EventType::Deadline,
        EventType::WorkPlan,
    ];

    /// Whether events of this type put hours on a worker's day.
    pub fn carries_assignment(&self) -> bool {
        matches!(
            self,
            EventType::Resource | EventType::Task | EventType::WorkPlan
        )
    }
}

/// Priority of an event, ordered least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for EventPriority {
    fn default() -> Self {
        EventPriority::Medium
    }
}

/// Lifecycle status of an event.
///
/// Valid transitions:
/// - SCHEDULED → IN_PROGRESS | COMPLETED | CANCELLED
/// - IN_PROGRESS → COMPLETED | CANCELLED
/// - COMPLETED and CANCELLED are terminal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Scheduled
    }
}

impl EventStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &EventStatus) -> bool {
        match self {
            EventStatus::Scheduled => matches!(
                to,
                EventStatus::InProgress | EventStatus::Completed | EventStatus::Cancelled
            ),
            EventStatus::InProgress => {
                matches!(to, EventStatus::Completed | EventStatus::Cancelled)
            }
            EventStatus::Completed => false,
            EventStatus::Cancelled => false,
        }
    }

    /// Whether this status still occupies the calendar.
    pub fn is_live(&self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::InProgress)
    }
}

/// Error returned when a status transition is not allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTransitionError {
    pub from: EventStatus,
    pub to: EventStatus,
}

impl std::fmt::Display for StatusTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid status transition: {:?} -> {:?}",
            self.from, self.to
        )
    }
}

impl std::error::Error for StatusTransitionError {}

/// Category of an approved leave event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveKind {
    Vacation,
    Sick,
    Personal,
    Parental,
    Compensatory,
    Emergency,
}

impl LeaveKind {
    /// Display label used in availability rows.
    pub fn label(&self) -> &'static str {
        match self {
            LeaveKind::Vacation => "Vacation",
            LeaveKind::Sick => "Sick leave",
            LeaveKind::Personal => "Personal leave",
            LeaveKind::Parental => "Parental leave",
            LeaveKind::Compensatory => "Compensatory leave",
            LeaveKind::Emergency => "Emergency leave",
        }
    }
}

/// Foreign keys linking an event back to its source records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_request_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_plan_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<i64>,
}

/// Staffing requirement attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirement {
    /// Required skill, e.g. "tower_crane"; None means any operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_type: Option<String>,
    /// Whether a valid certificate is required for the skill
    #[serde(default)]
    pub certification_required: bool,
    /// How many operators the requirement needs
    pub worker_count: u32,
    /// Total estimated hours across the event's span
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, swapping the bounds if given in reverse.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// A single-day range.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// The Monday-to-Sunday week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let start = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        Self {
            start,
            end: start + Days::new(6),
        }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Option<Self> {
        let start = date.with_day(1)?;
        let next_month = if date.month() == 12 {
            start.with_year(date.year() + 1)?.with_month(1)?
        } else {
            start.with_month(date.month() + 1)?
        };
        Some(Self {
            start,
            end: next_month.pred_opt()?,
        })
    }

    /// Number of days in the range (at least 1).
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterate the days of the range in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |d| {
            d.succ_opt().filter(|next| *next <= end)
        })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` lies entirely inside this range.
    pub fn covers(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The smallest range covering both.
    pub fn union(&self, other: &DateRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// One scheduling fact on the management calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Stable event id (uuid for engine-created events)
    pub id: String,
    /// Kind of fact
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start instant
    pub date: DateTime<Utc>,
    /// End instant; None means a single-day event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: EventPriority,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub related: RelatedEntities,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_requirements: Vec<ResourceRequirement>,
    /// Conflicts attached by the detector; empty until annotated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictInfo>,
    /// True when the event is understaffed or carries a blocking conflict
    #[serde(default)]
    pub action_required: bool,
    /// Set for Leave events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_kind: Option<LeaveKind>,
    /// Half-day leave occupies the day but reads differently
    #[serde(default)]
    pub half_day: bool,
    /// Version stamp, bumped on every mutation
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Create an event, validating that the window is not inverted.
    pub fn try_new(
        id: impl Into<String>,
        event_type: EventType,
        title: impl Into<String>,
        date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Self, DataIntegrityError> {
        if let Some(end) = end_date {
            if end < date {
                return Err(DataIntegrityError::InvalidEventWindow { start: date, end });
            }
        }
        Ok(Self {
            id: id.into(),
            event_type,
            title: title.into(),
            description: None,
            date,
            end_date,
            priority: EventPriority::default(),
            status: EventStatus::default(),
            related: RelatedEntities::default(),
            resource_requirements: Vec::new(),
            conflicts: Vec::new(),
            action_required: false,
            leave_kind: None,
            half_day: false,
            updated_at: Utc::now(),
        })
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_worker(mut self, worker_id: i64) -> Self {
        self.related.worker_id = Some(worker_id);
        self
    }

    pub fn with_project(mut self, project_id: i64) -> Self {
        self.related.project_id = Some(project_id);
        self
    }

    pub fn with_requirement(mut self, requirement: ResourceRequirement) -> Self {
        self.resource_requirements.push(requirement);
        self
    }

    pub fn with_leave(mut self, kind: LeaveKind, half_day: bool) -> Self {
        self.leave_kind = Some(kind);
        self.half_day = half_day;
        self
    }

    /// Transition to a new status.
    ///
    /// Returns an error if the transition is invalid.
    pub fn transition_to(&mut self, status: EventStatus) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(&status) {
            return Err(StatusTransitionError {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// The inclusive day span the event occupies.
    pub fn range(&self) -> DateRange {
        let start = self.date.date_naive();
        let end = self
            .end_date
            .map(|e| e.date_naive())
            .unwrap_or(start)
            .max(start);
        DateRange { start, end }
    }

    /// Number of days the event covers (at least 1).
    pub fn duration_days(&self) -> i64 {
        self.range().num_days()
    }

    pub fn is_multi_day(&self) -> bool {
        self.duration_days() > 1
    }

    /// Whether the event concerns the given worker.
    pub fn involves_worker(&self, worker_id: i64) -> bool {
        self.related.worker_id == Some(worker_id)
    }

    /// Sum of requirement-level hour estimates, when any are present.
    pub fn estimated_hours(&self) -> Option<f64> {
        let hours: Vec<f64> = self
            .resource_requirements
            .iter()
            .filter_map(|r| r.estimated_hours)
            .collect();
        if hours.is_empty() {
            None
        } else {
            Some(hours.iter().sum())
        }
    }

    /// Total operators the event's requirements call for.
    pub fn required_worker_count(&self) -> u32 {
        self.resource_requirements
            .iter()
            .map(|r| r.worker_count)
            .sum()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn requires_certification(&self) -> bool {
        self.resource_requirements
            .iter()
            .any(|r| r.certification_required)
    }

    /// Whether the event still occupies the calendar.
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }
}
