//! Conflict detection over a roster and event set.

use std::collections::BTreeMap;

use super::{ConflictInfo, ConflictSeverity, ConflictType};
use crate::availability::{AvailabilityAggregator, per_day_hours};
use crate::calendar::{CalendarEvent, DateRange, EventType};
use crate::error::Result;
use crate::policy::CapacityPolicy;
use crate::roster::Worker;

/// Detects scheduling conflicts under a capacity policy.
///
/// Detection is a pure read: it produces a map from event id to that
/// event's conflicts and touches nothing else. Completed and cancelled
/// events never participate.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    policy: CapacityPolicy,
}

impl ConflictDetector {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    /// Detect conflicts across the whole event set.
    ///
    /// # Returns
    /// A map keyed by event id; events without conflicts have no entry.
    pub fn detect(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
    ) -> Result<BTreeMap<String, Vec<ConflictInfo>>> {
        let mut out: BTreeMap<String, Vec<ConflictInfo>> = BTreeMap::new();
        let by_id: BTreeMap<i64, &Worker> = workers.iter().map(|w| (w.id, w)).collect();

        self.detect_double_bookings(&by_id, events, &mut out);
        self.detect_over_capacity(workers, events, &mut out)?;
        self.detect_skill_mismatches(&by_id, events, &mut out);
        self.detect_leave_overlaps(&by_id, events, &mut out);

        Ok(out)
    }

    /// Detect conflicts for events touching the given range.
    ///
    /// Overlap partners outside the range still count; only the reported
    /// keys are limited to in-range events.
    pub fn detect_in_range(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        range: DateRange,
    ) -> Result<BTreeMap<String, Vec<ConflictInfo>>> {
        let mut all = self.detect(workers, events)?;
        let in_range: std::collections::BTreeSet<&str> = events
            .iter()
            .filter(|e| e.range().overlaps(&range))
            .map(|e| e.id.as_str())
            .collect();
        all.retain(|id, _| in_range.contains(id.as_str()));
        Ok(all)
    }

    fn detect_double_bookings(
        &self,
        workers: &BTreeMap<i64, &Worker>,
        events: &[CalendarEvent],
        out: &mut BTreeMap<String, Vec<ConflictInfo>>,
    ) {
        for (worker_id, worker) in workers {
            let booked: Vec<&CalendarEvent> = events
                .iter()
                .filter(|e| {
                    e.is_live()
                        && e.event_type.carries_assignment()
                        && e.involves_worker(*worker_id)
                })
                .collect();
            let capacity = worker.capacity(&self.policy);
            for (i, event) in booked.iter().enumerate() {
                for other in booked.iter().skip(i + 1) {
                    if !event.range().overlaps(&other.range()) {
                        continue;
                    }
                    // Overlap alone is not double-booking; the pair must
                    // overcommit a shared day.
                    let combined = per_day_hours(event, &self.policy)
                        + per_day_hours(other, &self.policy);
                    if combined <= capacity {
                        continue;
                    }
                    for (this, that) in [(event, other), (other, event)] {
                        push_conflict(
                            out,
                            &this.id,
                            ConflictInfo {
                                conflict_type: ConflictType::DoubleBooking,
                                severity: ConflictSeverity::High,
                                description: format!(
                                    "{} is double-booked: '{}' overlaps '{}'",
                                    worker.display_name(),
                                    this.title,
                                    that.title
                                ),
                                resolution: Some(
                                    "Reschedule event or assign different worker".to_string(),
                                ),
                                conflicting_event_id: Some(that.id.clone()),
                                affected_worker_ids: vec![*worker_id],
                            },
                        );
                    }
                }
            }
        }
    }

    fn detect_over_capacity(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        out: &mut BTreeMap<String, Vec<ConflictInfo>>,
    ) -> Result<()> {
        let range = match event_envelope(events) {
            Some(range) => range,
            None => return Ok(()),
        };
        let aggregator = AvailabilityAggregator::new(self.policy.clone());
        let matrix = aggregator.compute(workers, events, range)?;

        // Worst overloaded day per event, earliest day winning ties.
        let mut worst: BTreeMap<String, (ConflictSeverity, String, i64)> = BTreeMap::new();
        for row in &matrix.rows {
            for (date, cell) in &row.daily {
                if cell.assigned_hours <= self.policy.overload_limit(cell.max_capacity_hours) {
                    continue;
                }
                let severity = self.overload_severity(cell.utilization());
                let description = format!(
                    "{} has {:.1}h assigned on {} against {:.1}h capacity",
                    row.worker.display_name(),
                    cell.assigned_hours,
                    date,
                    cell.max_capacity_hours
                );
                for event in events.iter().filter(|e| {
                    e.is_live()
                        && e.event_type.carries_assignment()
                        && e.involves_worker(row.worker.id)
                        && e.range().contains(*date)
                }) {
                    let entry = worst.entry(event.id.clone());
                    match entry {
                        std::collections::btree_map::Entry::Occupied(mut occupied) => {
                            if severity > occupied.get().0 {
                                occupied.insert((severity, description.clone(), row.worker.id));
                            }
                        }
                        std::collections::btree_map::Entry::Vacant(vacant) => {
                            vacant.insert((severity, description.clone(), row.worker.id));
                        }
                    }
                }
            }
        }

        for (event_id, (severity, description, worker_id)) in worst {
            push_conflict(
                out,
                &event_id,
                ConflictInfo {
                    conflict_type: ConflictType::OverCapacity,
                    severity,
                    description,
                    resolution: Some("Reduce workload or increase capacity".to_string()),
                    conflicting_event_id: None,
                    affected_worker_ids: vec![worker_id],
                },
            );
        }
        Ok(())
    }

    fn overload_severity(&self, utilization: f64) -> ConflictSeverity {
        if utilization > self.policy.critical_overload_ratio {
            ConflictSeverity::Critical
        } else if utilization > self.policy.high_overload_ratio {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        }
    }

    fn detect_skill_mismatches(
        &self,
        workers: &BTreeMap<i64, &Worker>,
        events: &[CalendarEvent],
        out: &mut BTreeMap<String, Vec<ConflictInfo>>,
    ) {
        for event in events.iter().filter(|e| e.is_live()) {
            let worker = match event.related.worker_id.and_then(|id| workers.get(&id)) {
                Some(worker) => worker,
                None => continue,
            };
            let start_day = event.range().start;
            for requirement in &event.resource_requirements {
                let skill_type = match &requirement.skill_type {
                    Some(skill_type) => skill_type,
                    None => continue,
                };
                let description = match worker.skill(skill_type) {
                    None => format!(
                        "{} lacks required skill '{}'",
                        worker.display_name(),
                        skill_type
                    ),
                    Some(skill) => {
                        if requirement.certification_required
                            && !skill.is_certification_valid(start_day)
                        {
                            format!(
                                "{} has no valid certification for '{}'",
                                worker.display_name(),
                                skill_type
                            )
                        } else {
                            continue;
                        }
                    }
                };
                push_conflict(
                    out,
                    &event.id,
                    ConflictInfo {
                        conflict_type: ConflictType::SkillMismatch,
                        severity: ConflictSeverity::High,
                        description,
                        resolution: Some("Assign worker with required certificates".to_string()),
                        conflicting_event_id: None,
                        affected_worker_ids: vec![worker.id],
                    },
                );
            }
        }
    }

    fn detect_leave_overlaps(
        &self,
        workers: &BTreeMap<i64, &Worker>,
        events: &[CalendarEvent],
        out: &mut BTreeMap<String, Vec<ConflictInfo>>,
    ) {
        for (worker_id, worker) in workers {
            let leaves: Vec<&CalendarEvent> = events
                .iter()
                .filter(|e| {
                    e.is_live()
                        && e.event_type == EventType::Leave
                        && e.involves_worker(*worker_id)
                })
                .collect();
            if leaves.is_empty() {
                continue;
            }
            for event in events.iter().filter(|e| {
                e.is_live() && e.event_type.carries_assignment() && e.involves_worker(*worker_id)
            }) {
                for leave in &leaves {
                    if !event.range().overlaps(&leave.range()) {
                        continue;
                    }
                    push_conflict(
                        out,
                        &event.id,
                        ConflictInfo {
                            conflict_type: ConflictType::LeaveOverlap,
                            severity: ConflictSeverity::Critical,
                            description: format!(
                                "{} is assigned to '{}' during approved leave",
                                worker.display_name(),
                                event.title
                            ),
                            resolution: Some("Reassign to available worker".to_string()),
                            conflicting_event_id: Some(leave.id.clone()),
                            affected_worker_ids: vec![*worker_id],
                        },
                    );
                }
            }
        }
    }
}

fn push_conflict(
    out: &mut BTreeMap<String, Vec<ConflictInfo>>,
    event_id: &str,
    conflict: ConflictInfo,
) {
    out.entry(event_id.to_string()).or_default().push(conflict);
}

fn event_envelope(events: &[CalendarEvent]) -> Option<DateRange> {
    events
        .iter()
        .map(|e| e.range())
        .reduce(|a, b| a.union(&b))
}

/// Return events with conflicts attached and `action_required` recomputed.
///
/// An event requires action when its requirements ask for more workers
/// than are assigned, or when any attached conflict is blocking.
pub fn attach_conflicts(
    events: &[CalendarEvent],
    conflicts: &BTreeMap<String, Vec<ConflictInfo>>,
) -> Vec<CalendarEvent> {
    events
        .iter()
        .map(|event| {
            let mut annotated = event.clone();
            annotated.conflicts = conflicts.get(&event.id).cloned().unwrap_or_default();
            let assigned = event.related.worker_id.map_or(0, |_| 1);
            let understaffed = event.required_worker_count() > assigned;
            let blocking = annotated.conflicts.iter().any(|c| c.is_blocking());
            annotated.action_required = understaffed || blocking;
            annotated
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventStatus, LeaveKind, ResourceRequirement};
    use crate::roster::{SkillLevel, WorkerSkill};
    use chrono::{NaiveDate, TimeZone, Utc};

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
            Utc.with_ymd_and_hms(2026, 3, day, 7, 0, 0).unwrap(),
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

    fn leave(id: &str, worker_id: i64, from: u32, to: u32) -> CalendarEvent {
        CalendarEvent::try_new(
            id,
            EventType::Leave,
            "Vacation",
            Utc.with_ymd_and_hms(2026, 3, from, 0, 0, 0).unwrap(),
            Some(Utc.with_ymd_and_hms(2026, 3, to, 0, 0, 0).unwrap()),
        )
        .unwrap()
        .with_worker(worker_id)
        .with_leave(LeaveKind::Vacation, false)
    }

    #[test]
    fn overcommitting_overlap_flags_both_events() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        let events = [task("a", 7, 10, 5.0), task("b", 7, 10, 4.0)];
        let conflicts = detector.detect(&workers, &events).unwrap();

        let on_a = &conflicts["a"];
        let on_b = &conflicts["b"];
        assert!(on_a
            .iter()
            .any(|c| c.conflict_type == ConflictType::DoubleBooking
                && c.conflicting_event_id.as_deref() == Some("b")));
        assert!(on_b
            .iter()
            .any(|c| c.conflict_type == ConflictType::DoubleBooking
                && c.conflicting_event_id.as_deref() == Some("a")));
        assert!(on_a.iter().all(|c| c.severity == ConflictSeverity::High
            || c.conflict_type != ConflictType::DoubleBooking));
    }

    #[test]
    fn overlap_that_fits_the_day_is_not_double_booking() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        // 4h + 4h fills an 8h day exactly without overcommitting it
        let events = [task("a", 7, 10, 4.0), task("b", 7, 10, 4.0)];
        let conflicts = detector.detect(&workers, &events).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn non_overlapping_assignments_do_not_conflict() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        let events = [task("a", 7, 10, 5.0), task("b", 7, 11, 5.0)];
        let conflicts = detector.detect(&workers, &events).unwrap();
        assert!(!conflicts
            .values()
            .flatten()
            .any(|c| c.conflict_type == ConflictType::DoubleBooking));
    }

    #[test]
    fn over_capacity_severity_follows_the_policy_ladder() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];

        let medium = detector
            .detect(&workers, &[task("a", 7, 10, 5.0), task("b", 7, 10, 4.0)])
            .unwrap();
        let found = medium["a"]
            .iter()
            .find(|c| c.conflict_type == ConflictType::OverCapacity)
            .unwrap();
        assert_eq!(found.severity, ConflictSeverity::Medium);

        let high = detector
            .detect(&workers, &[task("a", 7, 10, 6.0), task("b", 7, 10, 4.0)])
            .unwrap();
        let found = high["a"]
            .iter()
            .find(|c| c.conflict_type == ConflictType::OverCapacity)
            .unwrap();
        assert_eq!(found.severity, ConflictSeverity::High);

        let critical = detector
            .detect(&workers, &[task("a", 7, 10, 9.0), task("b", 7, 10, 4.0)])
            .unwrap();
        let found = critical["a"]
            .iter()
            .find(|c| c.conflict_type == ConflictType::OverCapacity)
            .unwrap();
        assert_eq!(found.severity, ConflictSeverity::Critical);
    }

    #[test]
    fn missing_skill_and_invalid_certification_are_flagged() {
        let detector = ConflictDetector::default();
        let mut certified = worker(7, "Lars Berg");
        certified.skills.push(WorkerSkill {
            skill_type: "tower_crane".to_string(),
            level: SkillLevel::Advanced,
            certified: true,
            certification_expires: NaiveDate::from_ymd_opt(2026, 1, 31),
        });
        let requirement = ResourceRequirement {
            skill_type: Some("tower_crane".to_string()),
            certification_required: true,
            worker_count: 1,
            estimated_hours: Some(4.0),
        };
        let event = CalendarEvent::try_new(
            "a",
            EventType::Task,
            "Tower lift",
            Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0).unwrap(),
            None,
        )
        .unwrap()
        .with_worker(7)
        .with_requirement(requirement.clone());

        // certification expired before the event
        let conflicts = detector.detect(&[certified.clone()], &[event.clone()]).unwrap();
        assert!(conflicts["a"]
            .iter()
            .any(|c| c.conflict_type == ConflictType::SkillMismatch));

        // missing skill entirely
        let conflicts = detector
            .detect(&[worker(7, "Lars Berg")], &[event.clone()])
            .unwrap();
        assert!(conflicts["a"]
            .iter()
            .any(|c| c.conflict_type == ConflictType::SkillMismatch
                && c.description.contains("lacks required skill")));

        // valid certification passes
        certified.skills[0].certification_expires = NaiveDate::from_ymd_opt(2026, 12, 31);
        let conflicts = detector.detect(&[certified], &[event]).unwrap();
        assert!(!conflicts
            .values()
            .flatten()
            .any(|c| c.conflict_type == ConflictType::SkillMismatch));
    }

    #[test]
    fn assignment_during_leave_is_critical_on_the_assignment() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        let events = [leave("l", 7, 9, 13), task("a", 7, 10, 4.0)];
        let conflicts = detector.detect(&workers, &events).unwrap();

        let found = conflicts["a"]
            .iter()
            .find(|c| c.conflict_type == ConflictType::LeaveOverlap)
            .unwrap();
        assert_eq!(found.severity, ConflictSeverity::Critical);
        assert_eq!(found.conflicting_event_id.as_deref(), Some("l"));
        assert!(!conflicts.contains_key("l"));
    }

    #[test]
    fn overlapping_leaves_are_not_a_conflict() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        let events = [leave("l1", 7, 9, 13), leave("l2", 7, 11, 15)];
        let conflicts = detector.detect(&workers, &events).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn finished_events_never_conflict() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        let mut done = task("a", 7, 10, 4.0);
        done.status = EventStatus::Completed;
        let mut cancelled = task("b", 7, 10, 4.0);
        cancelled.status = EventStatus::Cancelled;
        let conflicts = detector
            .detect(&workers, &[done, cancelled, task("c", 7, 10, 4.0)])
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn scoped_detection_keeps_partners_outside_the_range() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        // "a" spans into the range; "b" sits outside it
        let a = CalendarEvent::try_new(
            "a",
            EventType::Task,
            "Task a",
            Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0).unwrap(),
            Some(Utc.with_ymd_and_hms(2026, 3, 14, 15, 0, 0).unwrap()),
        )
        .unwrap()
        .with_worker(7);
        let b = task("b", 7, 10, 4.0);
        let scope = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        );
        let conflicts = detector.detect_in_range(&workers, &[a, b], scope).unwrap();
        assert!(conflicts.contains_key("a"));
        assert!(!conflicts.contains_key("b"));
        assert!(conflicts["a"]
            .iter()
            .any(|c| c.conflicting_event_id.as_deref() == Some("b")));
    }

    #[test]
    fn attach_populates_conflicts_and_action_required() {
        let detector = ConflictDetector::default();
        let workers = [worker(7, "Lars Berg")];
        let mut unstaffed = CalendarEvent::try_new(
            "u",
            EventType::Task,
            "Needs crew",
            Utc.with_ymd_and_hms(2026, 3, 20, 7, 0, 0).unwrap(),
            None,
        )
        .unwrap();
        unstaffed.resource_requirements.push(ResourceRequirement {
            skill_type: None,
            certification_required: false,
            worker_count: 2,
            estimated_hours: Some(8.0),
        });
        let events = vec![task("a", 7, 10, 5.0), task("b", 7, 10, 4.0), unstaffed];
        let conflicts = detector.detect(&workers, &events).unwrap();
        let annotated = attach_conflicts(&events, &conflicts);

        let a = annotated.iter().find(|e| e.id == "a").unwrap();
        assert!(a.has_conflicts());
        assert!(a.action_required);
        let u = annotated.iter().find(|e| e.id == "u").unwrap();
        assert!(!u.has_conflicts());
        assert!(u.action_required);
    }
}
