//! Dry-run validation of proposed event moves.
//!
//! Validation is a pure read over the current schedule: it reports every
//! violated rule, non-blocking warnings, and the conflicts the event
//! would carry at its destination. Nothing is mutated; applying the move
//! is the store's job.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityAggregator;
use crate::calendar::{CalendarEvent, DateRange};
use crate::conflict::{ConflictDetector, ConflictInfo};
use crate::error::{CoreError, Result};
use crate::policy::CapacityPolicy;
use crate::roster::Worker;

/// A proposed reschedule of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub event_id: String,
    pub new_date: DateTime<Utc>,
    /// Omitting the end date makes the event single-day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_end_date: Option<DateTime<Utc>>,
    /// When set, the apply step fails if the event changed since this stamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl MoveRequest {
    pub fn new(event_id: impl Into<String>, new_date: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            new_date,
            new_end_date: None,
            expected_updated_at: None,
        }
    }

    pub fn with_end_date(mut self, new_end_date: DateTime<Utc>) -> Self {
        self.new_end_date = Some(new_end_date);
        self
    }

    pub fn with_expected_stamp(mut self, stamp: DateTime<Utc>) -> Self {
        self.expected_updated_at = Some(stamp);
        self
    }

    /// The day span of the proposed window.
    pub fn window(&self) -> DateRange {
        let start = self.new_date.date_naive();
        let end = self
            .new_end_date
            .map(|e| e.date_naive())
            .unwrap_or(start);
        DateRange::new(start, end)
    }
}

/// Result of validating a move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Whether the move may be applied.
    pub is_valid: bool,
    /// Violated rules (empty if valid).
    pub errors: Vec<String>,
    /// Non-blocking issues worth showing the planner.
    pub warnings: Vec<String>,
    /// Conflicts the event would carry at its destination.
    pub would_create_conflicts: Vec<ConflictInfo>,
}

impl ValidationResult {
    /// Create a successful validation result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
            would_create_conflicts: vec![],
        }
    }

    /// Create a failed validation result with errors.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: vec![],
            would_create_conflicts: vec![],
        }
    }

    /// Add a warning to the result.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Validates proposed moves against the schedule and policy.
#[derive(Debug, Clone, Default)]
pub struct MoveValidator {
    policy: CapacityPolicy,
}

impl MoveValidator {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    /// Validate a move against the current clock.
    pub fn validate(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        request: &MoveRequest,
    ) -> Result<ValidationResult> {
        self.validate_at(workers, events, request, Utc::now())
    }

    /// Validate a move with an explicit "now" reference.
    ///
    /// # Returns
    /// `Err(NotFound)` when the event id is unknown; otherwise the full
    /// rule evaluation, with every violated rule listed.
    pub fn validate_at(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        request: &MoveRequest,
        now: DateTime<Utc>,
    ) -> Result<ValidationResult> {
        let event = events
            .iter()
            .find(|e| e.id == request.event_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: request.event_id.clone(),
            })?;

        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let window = request.window();

        if let Some(end) = request.new_end_date {
            if end < request.new_date {
                errors.push("event end date cannot be before its start date".to_string());
            }
        }

        if request.new_date.date_naive() < now.date_naive()
            && !self.policy.is_backdatable(event.event_type)
        {
            errors.push("event cannot be moved into the past".to_string());
        }

        if let Some(collision) = self.find_immovable_collision(event, events, window) {
            errors.push(format!(
                "move collides with immovable event '{}'",
                collision.title
            ));
        }

        let moved = simulate_move(events, request);

        if let Some(worker_id) = event.related.worker_id {
            if event.event_type.carries_assignment() {
                self.check_capacity(workers, &moved, worker_id, window, &mut errors, &mut warnings);
            }
        }

        if window.days().any(|d| is_weekend(d.weekday())) {
            warnings.push("event window touches a weekend".to_string());
        }
        if outside_business_hours(request.new_date) {
            warnings.push("event starts outside business hours (06:00-18:00)".to_string());
        }
        if request.new_end_date.is_some_and(outside_business_hours) {
            warnings.push("event ends outside business hours (06:00-18:00)".to_string());
        }

        let detector = ConflictDetector::new(self.policy.clone());
        let would_create_conflicts = detector
            .detect_in_range(workers, &moved, window)?
            .remove(&request.event_id)
            .unwrap_or_default();

        Ok(ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            would_create_conflicts,
        })
    }

    /// An immovable-type event of the same worker overlapping the target
    /// window, if any. Immovable-type events may themselves move freely.
    fn find_immovable_collision<'a>(
        &self,
        event: &CalendarEvent,
        events: &'a [CalendarEvent],
        window: DateRange,
    ) -> Option<&'a CalendarEvent> {
        if !event.event_type.carries_assignment() {
            return None;
        }
        let worker_id = event.related.worker_id?;
        events.iter().find(|other| {
            other.id != event.id
                && other.is_live()
                && self.policy.is_immovable(other.event_type)
                && other.involves_worker(worker_id)
                && other.range().overlaps(&window)
        })
    }

    fn check_capacity(
        &self,
        workers: &[Worker],
        moved: &[CalendarEvent],
        worker_id: i64,
        window: DateRange,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let aggregator = AvailabilityAggregator::new(self.policy.clone());
        let matrix = match aggregator.compute(workers, moved, window) {
            Ok(matrix) => matrix,
            // integrity errors surface through the conflict pass instead
            Err(_) => return,
        };
        let row = match matrix.row(worker_id) {
            Some(row) => row,
            None => return,
        };
        for cell in row.daily.values() {
            if cell.leave.is_some() {
                continue;
            }
            if cell.assigned_hours > self.policy.overload_limit(cell.max_capacity_hours) {
                if self.policy.forbid_overload {
                    errors.push(format!(
                        "move would push {} past daily capacity on {}",
                        row.worker.display_name(),
                        cell.date
                    ));
                    return;
                }
            }
            if cell.utilization() >= self.policy.full_threshold && cell.assigned_hours > 0.0 {
                warnings.push(format!(
                    "{} exceeds {:.0}% utilization on {}",
                    row.worker.display_name(),
                    self.policy.full_threshold * 100.0,
                    cell.date
                ));
                return;
            }
        }
    }
}

/// Clone the event set with the requested move applied.
fn simulate_move(events: &[CalendarEvent], request: &MoveRequest) -> Vec<CalendarEvent> {
    events
        .iter()
        .map(|event| {
            if event.id == request.event_id {
                let mut moved = event.clone();
                moved.date = request.new_date;
                moved.end_date = request.new_end_date;
                moved
            } else {
                event.clone()
            }
        })
        .collect()
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

fn outside_business_hours(t: DateTime<Utc>) -> bool {
    let seconds = t.num_seconds_from_midnight();
    seconds < 6 * 3600 || seconds > 18 * 3600
}
