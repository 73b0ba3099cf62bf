//! The shared event store behind `apply_move`.
//!
//! All writes serialize through one lock. `apply_move` re-validates the
//! request inside that lock, so two racing moves can never both pass
//! validation against a stale snapshot: the second sees the first's
//! committed state. Reads clone a consistent snapshot out and never block
//! writers for long.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::validator::{MoveRequest, MoveValidator, ValidationResult};
use crate::availability::{AvailabilityAggregator, AvailabilityMatrix};
use crate::calendar::{CalendarEvent, CalendarSummary, DateRange};
use crate::conflict::{attach_conflicts, ConflictDetector, ConflictInfo, ConflictSeverity};
use crate::error::{CoreError, DataIntegrityError, InvalidMoveError, Result};
use crate::policy::CapacityPolicy;
use crate::roster::Worker;

/// How much of the schedule an applied move forced us to recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecomputeScope {
    /// Only the union of the old and new windows was refreshed
    Scoped(DateRange),
    /// The move left the loaded range; everything was recomputed
    Full,
}

/// Result of a successfully applied move.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// The event after the move, with refreshed conflicts attached
    pub event: CalendarEvent,
    /// The in-lock validation run, including any warnings
    pub validation: ValidationResult,
    pub recompute: RecomputeScope,
}

/// Result of an attempted worker assignment.
///
/// Critical conflicts refuse the commit; anything milder commits with
/// the conflicts reported for follow-up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDecision {
    pub committed: bool,
    pub conflicts: Vec<ConflictInfo>,
}

/// A consistent read of the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    /// Events in insertion order, conflicts attached
    pub events: Vec<CalendarEvent>,
    pub matrix: AvailabilityMatrix,
    pub summary: CalendarSummary,
    pub as_of: DateTime<Utc>,
}

struct StoreInner {
    workers: Vec<Worker>,
    events: Vec<CalendarEvent>,
    range: DateRange,
    matrix: AvailabilityMatrix,
    conflicts: BTreeMap<String, Vec<ConflictInfo>>,
}

/// Serialized writer over the loaded schedule range.
pub struct ScheduleStore {
    policy: CapacityPolicy,
    inner: Mutex<StoreInner>,
}

impl ScheduleStore {
    /// Build a store over a loaded range, computing the initial matrix and
    /// conflict map. Fails fast on integrity problems.
    pub fn new(
        workers: Vec<Worker>,
        events: Vec<CalendarEvent>,
        range: DateRange,
        policy: CapacityPolicy,
    ) -> Result<Self> {
        verify_event_windows(&events)?;
        let now = Utc::now();
        let matrix =
            AvailabilityAggregator::new(policy.clone()).compute_as_of(&workers, &events, range, now)?;
        let conflicts = ConflictDetector::new(policy.clone()).detect(&workers, &events)?;
        Ok(Self {
            policy,
            inner: Mutex::new(StoreInner {
                workers,
                events,
                range,
                matrix,
                conflicts,
            }),
        })
    }

    /// Dry-run validation against the current snapshot.
    pub fn validate_move(&self, request: &MoveRequest) -> Result<ValidationResult> {
        self.validate_move_at(request, Utc::now())
    }

    /// Dry-run validation with an explicit "now" reference.
    pub fn validate_move_at(
        &self,
        request: &MoveRequest,
        now: DateTime<Utc>,
    ) -> Result<ValidationResult> {
        let (workers, events) = {
            let inner = self.lock()?;
            (inner.workers.clone(), inner.events.clone())
        };
        MoveValidator::new(self.policy.clone()).validate_at(&workers, &events, request, now)
    }

    /// Apply a move, re-validating inside the write lock.
    pub fn apply_move(&self, request: &MoveRequest) -> Result<MoveOutcome> {
        self.apply_move_at(request, Utc::now())
    }

    /// Apply a move with an explicit "now" reference.
    ///
    /// # Returns
    /// The updated event with refreshed conflicts, or an error leaving the
    /// store untouched: `NotFound` when the event is gone,
    /// `ConcurrentModification` when the version stamp no longer matches,
    /// `InvalidMove` when in-lock re-validation rejects the window.
    pub fn apply_move_at(&self, request: &MoveRequest, now: DateTime<Utc>) -> Result<MoveOutcome> {
        let mut inner = self.lock()?;

        let index = inner
            .events
            .iter()
            .position(|e| e.id == request.event_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: request.event_id.clone(),
            })?;

        if let Some(expected) = request.expected_updated_at {
            if inner.events[index].updated_at != expected {
                return Err(CoreError::ConcurrentModification {
                    event_id: request.event_id.clone(),
                });
            }
        }

        let validation = MoveValidator::new(self.policy.clone()).validate_at(
            &inner.workers,
            &inner.events,
            request,
            now,
        )?;
        if !validation.is_valid {
            return Err(CoreError::InvalidMove(InvalidMoveError {
                event_id: request.event_id.clone(),
                violations: validation.errors,
            }));
        }

        let old_window = inner.events[index].range();
        inner.events[index].date = request.new_date;
        inner.events[index].end_date = request.new_end_date;
        inner.events[index].updated_at = now;

        let touched = old_window.union(&request.window());
        let recompute = self.refresh(&mut inner, index, touched, now)?;

        let annotated = attach_conflicts(
            std::slice::from_ref(&inner.events[index]),
            &inner.conflicts,
        )
        .remove(0);

        Ok(MoveOutcome {
            event: annotated,
            validation,
            recompute,
        })
    }

    /// Add an event to the loaded range.
    pub fn insert_event(&self, event: CalendarEvent) -> Result<()> {
        verify_event_windows(std::slice::from_ref(&event))?;
        let mut inner = self.lock()?;
        if inner.events.iter().any(|e| e.id == event.id) {
            return Err(DataIntegrityError::DuplicateEventId(event.id).into());
        }
        inner.events.push(event);
        match self.recompute_all(&mut inner, Utc::now()) {
            Ok(()) => Ok(()),
            Err(err) => {
                inner.events.pop();
                Err(err)
            }
        }
    }

    /// Remove an event, returning it.
    pub fn remove_event(&self, event_id: &str) -> Result<CalendarEvent> {
        let mut inner = self.lock()?;
        let index = inner
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: event_id.to_string(),
            })?;
        let removed = inner.events.remove(index);
        self.recompute_all(&mut inner, Utc::now())?;
        Ok(removed)
    }

    /// Assign a worker to an event, refusing on Critical conflicts.
    pub fn assign_worker(
        &self,
        worker_id: i64,
        event_id: &str,
        equipment_id: Option<i64>,
    ) -> Result<AssignmentDecision> {
        self.assign_worker_at(worker_id, event_id, equipment_id, Utc::now())
    }

    /// Assign a worker with an explicit "now" reference.
    ///
    /// The hypothetical assignment is conflict-checked inside the write
    /// lock. A Critical conflict, a leave overlap say, refuses the commit
    /// and leaves the store untouched. Milder conflicts commit and come
    /// back in the decision for follow-up.
    pub fn assign_worker_at(
        &self,
        worker_id: i64,
        event_id: &str,
        equipment_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentDecision> {
        let mut inner = self.lock()?;
        if !inner.workers.iter().any(|w| w.id == worker_id) {
            return Err(CoreError::NotFound {
                entity: "worker",
                id: worker_id.to_string(),
            });
        }
        let index = inner
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: event_id.to_string(),
            })?;

        let mut hypothetical = inner.events.clone();
        hypothetical[index].related.worker_id = Some(worker_id);
        let window = hypothetical[index].range();
        let conflicts = ConflictDetector::new(self.policy.clone())
            .detect_in_range(&inner.workers, &hypothetical, window)?
            .remove(event_id)
            .unwrap_or_default();
        if conflicts
            .iter()
            .any(|c| c.severity == ConflictSeverity::Critical)
        {
            return Ok(AssignmentDecision {
                committed: false,
                conflicts,
            });
        }

        // Reassignment can touch two workers' rows, so recompute in full.
        inner.events[index].related.worker_id = Some(worker_id);
        if equipment_id.is_some() {
            inner.events[index].related.equipment_id = equipment_id;
        }
        inner.events[index].updated_at = now;
        self.recompute_all(&mut inner, now)?;

        let conflicts = inner.conflicts.get(event_id).cloned().unwrap_or_default();
        Ok(AssignmentDecision {
            committed: true,
            conflicts,
        })
    }

    /// A consistent snapshot: annotated events, matrix and summary.
    pub fn snapshot(&self) -> Result<ScheduleSnapshot> {
        self.snapshot_at(Utc::now())
    }

    /// Snapshot with an explicit "now" used for the summary's today.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Result<ScheduleSnapshot> {
        let inner = self.lock()?;
        let events = attach_conflicts(&inner.events, &inner.conflicts);
        let summary = CalendarSummary::compute(&events, now.date_naive());
        Ok(ScheduleSnapshot {
            events,
            matrix: inner.matrix.clone(),
            summary,
            as_of: now,
        })
    }

    /// The roster backing this store.
    pub fn workers(&self) -> Result<Vec<Worker>> {
        Ok(self.lock()?.workers.clone())
    }

    /// The policy this store validates and aggregates under.
    pub fn policy(&self) -> &CapacityPolicy {
        &self.policy
    }

    /// The currently loaded range.
    pub fn loaded_range(&self) -> Result<DateRange> {
        Ok(self.lock()?.range)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>> {
        self.inner.lock().map_err(|_| CoreError::StorePoisoned)
    }

    /// Refresh availability and conflicts after a committed move.
    ///
    /// Inside the loaded range only the moved event's worker row and the
    /// touched window's conflicts are recomputed; a move crossing outside
    /// the range expands it and recomputes everything.
    fn refresh(
        &self,
        inner: &mut StoreInner,
        moved_index: usize,
        touched: DateRange,
        now: DateTime<Utc>,
    ) -> Result<RecomputeScope> {
        if !inner.range.covers(&touched) {
            inner.range = inner.range.union(&touched);
            self.recompute_all(inner, now)?;
            return Ok(RecomputeScope::Full);
        }

        let aggregator = AvailabilityAggregator::new(self.policy.clone());
        if let Some(worker_id) = inner.events[moved_index].related.worker_id {
            if let Some(position) = inner.matrix.rows.iter().position(|r| r.worker.id == worker_id)
            {
                let worker = inner.matrix.rows[position].worker.clone();
                let row = aggregator
                    .compute_as_of(
                        std::slice::from_ref(&worker),
                        &inner.events,
                        inner.range,
                        now,
                    )?
                    .rows
                    .remove(0);
                inner.matrix.rows[position] = row;
                inner.matrix.computed_at = now;
            }
        }

        let detector = ConflictDetector::new(self.policy.clone());
        let refreshed = detector.detect_in_range(&inner.workers, &inner.events, touched)?;
        let stale: Vec<String> = inner
            .events
            .iter()
            .filter(|e| e.range().overlaps(&touched))
            .map(|e| e.id.clone())
            .collect();
        for id in stale {
            inner.conflicts.remove(&id);
        }
        inner.conflicts.extend(refreshed);

        Ok(RecomputeScope::Scoped(touched))
    }

    fn recompute_all(&self, inner: &mut StoreInner, now: DateTime<Utc>) -> Result<()> {
        let aggregator = AvailabilityAggregator::new(self.policy.clone());
        let matrix = aggregator.compute_as_of(&inner.workers, &inner.events, inner.range, now)?;
        let conflicts =
            ConflictDetector::new(self.policy.clone()).detect(&inner.workers, &inner.events)?;
        inner.matrix = matrix;
        inner.conflicts = conflicts;
        Ok(())
    }
}

fn verify_event_windows(events: &[CalendarEvent]) -> Result<()> {
    for event in events {
        if let Some(end) = event.end_date {
            if end < event.date {
                return Err(DataIntegrityError::InvalidEventWindow {
                    start: event.date,
                    end,
                }
                .into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventType, LeaveKind, ResourceRequirement};
    use crate::conflict::ConflictType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn worker(id: i64, name: &str) -> Worker {
        Worker {
            id,
            name: name.to_string(),
            role: "crane_operator".to_string(),
            is_active: true,
            skills: Vec::new(),
            max_daily_hours: None,
        }
    }

    fn task(id: &str, worker_id: i64, day: u32, hours: f64) -> CalendarEvent {
        CalendarEvent::try_new(
            id,
            EventType::Task,
            format!("Task {id}"),
            Utc.with_ymd_and_hms(2026, 3, day, 8, 0, 0).unwrap(),
            None,
        )
        .unwrap()
        .with_worker(worker_id)
        .with_requirement(ResourceRequirement {
            skill_type: None,
            certification_required: false,
            worker_count: 1,
            estimated_hours: Some(hours),
        })
    }

    fn store(events: Vec<CalendarEvent>) -> ScheduleStore {
        ScheduleStore::new(
            vec![worker(7, "Lars Berg"), worker(8, "Jonas Holm")],
            events,
            DateRange::new(
                chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
                chrono::NaiveDate::from_ymd_opt(2026, 3, 22).unwrap(),
            ),
            CapacityPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn apply_move_updates_window_and_version_stamp() {
        let store = store(vec![task("a", 7, 12, 4.0)]);
        let before = store.snapshot_at(now()).unwrap().events[0].updated_at;
        let request = MoveRequest::new("a", Utc.with_ymd_and_hms(2026, 3, 13, 8, 0, 0).unwrap());
        let outcome = store.apply_move_at(&request, now()).unwrap();

        assert_eq!(outcome.event.date, request.new_date);
        assert_eq!(outcome.event.updated_at, now());
        assert_ne!(outcome.event.updated_at, before);
        assert!(matches!(outcome.recompute, RecomputeScope::Scoped(_)));

        let after = store.snapshot_at(now()).unwrap();
        assert_eq!(after.events[0].date, request.new_date);
    }

    #[test]
    fn scoped_recompute_refreshes_matrix_and_conflicts() {
        let store = store(vec![task("a", 7, 12, 8.0), task("b", 7, 13, 8.0)]);
        let day_12 = chrono::NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        let day_13 = chrono::NaiveDate::from_ymd_opt(2026, 3, 13).unwrap();

        let before = store.snapshot_at(now()).unwrap();
        assert!((before.matrix.day(7, day_13).unwrap().assigned_hours - 8.0).abs() < 1e-9);
        assert!(before.events.iter().all(|e| e.conflicts.is_empty()));

        let request = MoveRequest::new("b", Utc.with_ymd_and_hms(2026, 3, 12, 8, 0, 0).unwrap());
        let outcome = store.apply_move_at(&request, now()).unwrap();
        assert_eq!(
            outcome.recompute,
            RecomputeScope::Scoped(DateRange::new(day_12, day_13))
        );
        assert!(outcome
            .event
            .conflicts
            .iter()
            .any(|c| c.conflict_type == ConflictType::DoubleBooking));

        let after = store.snapshot_at(now()).unwrap();
        assert!((after.matrix.day(7, day_12).unwrap().assigned_hours - 16.0).abs() < 1e-9);
        assert!((after.matrix.day(7, day_13).unwrap().assigned_hours).abs() < 1e-9);
        let moved = after.events.iter().find(|e| e.id == "b").unwrap();
        assert!(moved.action_required);
    }

    #[test]
    fn move_outside_loaded_range_triggers_full_recompute() {
        let store = store(vec![task("a", 7, 12, 4.0)]);
        let request = MoveRequest::new("a", Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap());
        let outcome = store.apply_move_at(&request, now()).unwrap();
        assert_eq!(outcome.recompute, RecomputeScope::Full);
        let range = store.loaded_range().unwrap();
        assert!(range.contains(chrono::NaiveDate::from_ymd_opt(2026, 4, 2).unwrap()));
    }

    #[test]
    fn invalid_move_fails_and_leaves_store_unchanged() {
        let store = store(vec![task("a", 7, 12, 4.0)]);
        let before = store.snapshot_at(now()).unwrap();
        let request = MoveRequest::new("a", Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        let err = store.apply_move_at(&request, now()).unwrap_err();
        match err {
            CoreError::InvalidMove(invalid) => {
                assert_eq!(invalid.event_id, "a");
                assert_eq!(
                    invalid.violations,
                    vec!["event cannot be moved into the past".to_string()]
                );
            }
            other => panic!("expected InvalidMove, got {other:?}"),
        }
        let after = store.snapshot_at(now()).unwrap();
        assert_eq!(after.events[0].date, before.events[0].date);
        assert_eq!(after.events[0].updated_at, before.events[0].updated_at);
    }

    #[test]
    fn stale_version_stamp_is_concurrent_modification() {
        let store = store(vec![task("a", 7, 12, 4.0)]);
        let stamp = store.snapshot_at(now()).unwrap().events[0].updated_at;

        let first = MoveRequest::new("a", Utc.with_ymd_and_hms(2026, 3, 13, 8, 0, 0).unwrap())
            .with_expected_stamp(stamp);
        store.apply_move_at(&first, now()).unwrap();

        let second = MoveRequest::new("a", Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap())
            .with_expected_stamp(stamp);
        let err = store.apply_move_at(&second, now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConcurrentModification { ref event_id } if event_id == "a"
        ));
    }

    #[test]
    fn insert_rejects_duplicate_ids_and_unknown_workers() {
        let store = store(vec![task("a", 7, 12, 4.0)]);
        let err = store.insert_event(task("a", 7, 13, 4.0)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DataIntegrity(DataIntegrityError::DuplicateEventId(_))
        ));

        let err = store.insert_event(task("z", 99, 13, 4.0)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DataIntegrity(DataIntegrityError::UnknownWorker { .. })
        ));
        // failed insert must not linger
        assert!(store
            .snapshot_at(now())
            .unwrap()
            .events
            .iter()
            .all(|e| e.id != "z"));
    }

    #[test]
    fn remove_event_refreshes_conflicts() {
        let store = store(vec![task("a", 7, 12, 5.0), task("b", 7, 12, 4.0)]);
        let snapshot = store.snapshot_at(now()).unwrap();
        assert!(snapshot.events.iter().any(|e| e.has_conflicts()));

        store.remove_event("b").unwrap();
        let snapshot = store.snapshot_at(now()).unwrap();
        assert_eq!(snapshot.events.len(), 1);
        assert!(snapshot.events.iter().all(|e| !e.has_conflicts()));

        assert!(matches!(
            store.remove_event("ghost").unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }

    #[test]
    fn assign_worker_refuses_on_critical_conflict() {
        let leave = CalendarEvent::try_new(
            "l",
            EventType::Leave,
            "Vacation",
            Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap(),
            None,
        )
        .unwrap()
        .with_worker(7)
        .with_leave(LeaveKind::Vacation, false);
        let store = store(vec![leave, task("t", 8, 12, 4.0)]);

        let decision = store.assign_worker_at(7, "t", None, now()).unwrap();
        assert!(!decision.committed);
        assert!(decision
            .conflicts
            .iter()
            .any(|c| c.conflict_type == ConflictType::LeaveOverlap
                && c.severity == ConflictSeverity::Critical));

        let snapshot = store.snapshot_at(now()).unwrap();
        let event = snapshot.events.iter().find(|e| e.id == "t").unwrap();
        assert_eq!(event.related.worker_id, Some(8));
    }

    #[test]
    fn assign_worker_commits_and_refreshes_both_rows() {
        let store = store(vec![task("a", 7, 12, 6.0), task("b", 8, 12, 4.0)]);
        let day_12 = chrono::NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();

        let decision = store.assign_worker_at(7, "b", Some(3), now()).unwrap();
        assert!(decision.committed);
        assert!(decision
            .conflicts
            .iter()
            .any(|c| c.conflict_type == ConflictType::DoubleBooking));

        let snapshot = store.snapshot_at(now()).unwrap();
        let event = snapshot.events.iter().find(|e| e.id == "b").unwrap();
        assert_eq!(event.related.worker_id, Some(7));
        assert_eq!(event.related.equipment_id, Some(3));
        assert!((snapshot.matrix.day(7, day_12).unwrap().assigned_hours - 10.0).abs() < 1e-9);
        assert!((snapshot.matrix.day(8, day_12).unwrap().assigned_hours).abs() < 1e-9);

        assert!(matches!(
            store.assign_worker_at(99, "b", None, now()).unwrap_err(),
            CoreError::NotFound { entity: "worker", .. }
        ));
    }

    #[test]
    fn leave_move_commits_for_backdating() {
        let leave = CalendarEvent::try_new(
            "l",
            EventType::Leave,
            "Sick leave",
            Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap(),
            None,
        )
        .unwrap()
        .with_worker(7)
        .with_leave(LeaveKind::Sick, false);
        let store = store(vec![leave]);
        let request = MoveRequest::new("l", Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        let outcome = store.apply_move_at(&request, now()).unwrap();
        assert!(outcome.validation.is_valid);
        let snapshot = store.snapshot_at(now()).unwrap();
        assert_eq!(
            snapshot.events[0].date,
            Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()
        );
    }
}
