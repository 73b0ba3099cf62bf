//! Availability aggregation: roster + events -> per-worker/per-day matrix.
//!
//! The aggregator walks every roster worker over every day of the
//! requested range. Assignment-carrying events spread their estimated
//! hours uniformly across the days they cover; leave events mark their
//! days; the status ladder then classifies each cell. Input problems
//! (unknown worker references, duplicate ids, empty names) abort the
//! whole computation with a data integrity error rather than producing
//! a partial matrix.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::matrix::{
    AvailabilityMatrix, AvailabilityStatus, CancelToken, DayAvailability, LeaveInfo, ProjectSlice,
    TaskSlice, WeeklyStats, WorkerAvailabilityRow,
};
use crate::calendar::{CalendarEvent, DateRange, EventType, LeaveKind};
use crate::error::{CoreError, DataIntegrityError, Result};
use crate::policy::CapacityPolicy;
use crate::roster::Worker;

/// Computes availability matrices under a capacity policy.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityAggregator {
    policy: CapacityPolicy,
}

impl AvailabilityAggregator {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CapacityPolicy {
        &self.policy
    }

    /// Compute the matrix for a range, stamped with the current time.
    pub fn compute(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        range: DateRange,
    ) -> Result<AvailabilityMatrix> {
        self.compute_as_of(workers, events, range, Utc::now())
    }

    /// Compute the matrix with an explicit stamp.
    pub fn compute_as_of(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        range: DateRange,
        computed_at: DateTime<Utc>,
    ) -> Result<AvailabilityMatrix> {
        self.compute_inner(workers, events, range, computed_at, None)
    }

    /// Compute with a cancellation token, checked between workers.
    pub fn compute_with_cancel(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        range: DateRange,
        cancel: &CancelToken,
    ) -> Result<AvailabilityMatrix> {
        self.compute_inner(workers, events, range, Utc::now(), Some(cancel))
    }

    fn compute_inner(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        range: DateRange,
        computed_at: DateTime<Utc>,
        cancel: Option<&CancelToken>,
    ) -> Result<AvailabilityMatrix> {
        verify_integrity(workers, events)?;

        let mut rows = Vec::with_capacity(workers.len());
        for worker in workers {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
            }
            rows.push(self.compute_row(worker, events, range));
        }

        Ok(AvailabilityMatrix {
            range,
            rows,
            computed_at,
        })
    }

    fn compute_row(
        &self,
        worker: &Worker,
        events: &[CalendarEvent],
        range: DateRange,
    ) -> WorkerAvailabilityRow {
        let capacity = worker.capacity(&self.policy);

        let mut daily: BTreeMap<NaiveDate, DayAvailability> = range
            .days()
            .map(|date| {
                (
                    date,
                    DayAvailability {
                        date,
                        status: AvailabilityStatus::Available,
                        assigned_hours: 0.0,
                        max_capacity_hours: capacity,
                        projects: Vec::new(),
                        tasks: Vec::new(),
                        leave: None,
                    },
                )
            })
            .collect();

        for event in events {
            if !event.involves_worker(worker.id) || !event.is_live() {
                continue;
            }
            let span = event.range();
            if !span.overlaps(&range) {
                continue;
            }
            if event.event_type == EventType::Leave {
                let info = LeaveInfo {
                    kind: event.leave_kind.unwrap_or(LeaveKind::Vacation),
                    half_day: event.half_day,
                };
                for day in span.days().filter(|d| range.contains(*d)) {
                    if let Some(cell) = daily.get_mut(&day) {
                        // Sick leave wins the cell label over other kinds
                        match &cell.leave {
                            Some(existing) if existing.kind == LeaveKind::Sick => {}
                            _ if info.kind == LeaveKind::Sick => cell.leave = Some(info.clone()),
                            Some(_) => {}
                            None => cell.leave = Some(info.clone()),
                        }
                    }
                }
            } else if event.event_type.carries_assignment() {
                let per_day = per_day_hours(event, &self.policy);
                for day in span.days().filter(|d| range.contains(*d)) {
                    if let Some(cell) = daily.get_mut(&day) {
                        cell.assigned_hours += per_day;
                        push_slice(cell, event, per_day);
                    }
                }
            }
        }

        for cell in daily.values_mut() {
            cell.status = self.classify(worker, cell);
        }

        let weekly = weekly_rollup(&daily);

        WorkerAvailabilityRow {
            worker: worker.clone(),
            daily,
            weekly,
        }
    }

    fn classify(&self, worker: &Worker, cell: &DayAvailability) -> AvailabilityStatus {
        if !worker.is_active {
            return AvailabilityStatus::Unavailable;
        }
        if let Some(leave) = &cell.leave {
            return if leave.kind == LeaveKind::Sick {
                AvailabilityStatus::Sick
            } else {
                AvailabilityStatus::OnLeave
            };
        }
        if cell.is_overloaded() {
            return AvailabilityStatus::Overloaded;
        }
        let utilization = cell.utilization();
        if utilization >= self.policy.full_threshold {
            AvailabilityStatus::Assigned
        } else if utilization > 0.0 {
            AvailabilityStatus::PartiallyBusy
        } else {
            AvailabilityStatus::Available
        }
    }
}

/// Hours an event puts on each day it covers.
///
/// Estimated hours spread uniformly over the event's full span; an
/// assignment without an estimate books a standard policy day.
pub(crate) fn per_day_hours(event: &CalendarEvent, policy: &CapacityPolicy) -> f64 {
    match event.estimated_hours() {
        Some(hours) => hours / event.duration_days() as f64,
        None => policy.default_daily_capacity_hours,
    }
}

fn push_slice(cell: &mut DayAvailability, event: &CalendarEvent, hours: f64) {
    let is_task_like = event.related.task_id.is_some()
        || matches!(event.event_type, EventType::Task | EventType::Resource);
    if is_task_like {
        cell.tasks.push(TaskSlice {
            task_id: event.related.task_id,
            task_name: event.title.clone(),
            hours,
        });
    } else {
        cell.projects.push(ProjectSlice {
            project_id: event.related.project_id,
            project_name: event.title.clone(),
            hours,
        });
    }
}

fn weekly_rollup(daily: &BTreeMap<NaiveDate, DayAvailability>) -> Vec<WeeklyStats> {
    #[derive(Default)]
    struct WeekAccum<'a> {
        assigned: f64,
        capacity: f64,
        // a multi-day slice repeats per day; key on id + name to count it once
        projects: BTreeSet<(Option<i64>, &'a str)>,
        tasks: BTreeSet<(Option<i64>, &'a str)>,
    }

    let mut weeks: BTreeMap<NaiveDate, WeekAccum<'_>> = BTreeMap::new();
    for (date, cell) in daily {
        let week_start = DateRange::week_of(*date).start;
        let entry = weeks.entry(week_start).or_default();
        entry.assigned += cell.assigned_hours;
        entry.capacity += cell.max_capacity_hours;
        for slice in &cell.projects {
            entry
                .projects
                .insert((slice.project_id, slice.project_name.as_str()));
        }
        for slice in &cell.tasks {
            entry.tasks.insert((slice.task_id, slice.task_name.as_str()));
        }
    }
    weeks
        .into_iter()
        .map(|(week_start, week)| WeeklyStats {
            week_start,
            total_assigned_hours: week.assigned,
            capacity_hours: week.capacity,
            utilization: if week.capacity <= 0.0 {
                0.0
            } else {
                week.assigned / week.capacity
            },
            project_count: week.projects.len(),
            task_count: week.tasks.len(),
        })
        .collect()
}

/// Reject rosters and event sets the matrix cannot be trusted on.
fn verify_integrity(workers: &[Worker], events: &[CalendarEvent]) -> Result<()> {
    let mut seen: BTreeSet<i64> = BTreeSet::new();
    for worker in workers {
        if !seen.insert(worker.id) {
            return Err(DataIntegrityError::DuplicateWorkerId(worker.id).into());
        }
        if worker.name.trim().is_empty() {
            return Err(DataIntegrityError::MissingWorkerName(worker.id).into());
        }
    }
    for event in events {
        if let Some(worker_id) = event.related.worker_id {
            if !seen.contains(&worker_id) {
                return Err(DataIntegrityError::UnknownWorker {
                    worker_id,
                    event_id: event.id.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}
