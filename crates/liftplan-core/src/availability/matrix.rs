//! Availability matrix types: per-worker rows of per-day cells.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::calendar::{DateRange, LeaveKind};
use crate::roster::Worker;

/// Availability state of one worker on one day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    /// No assignments on the day
    Available,
    /// At or above the full-utilization threshold
    Assigned,
    /// Covered by approved leave
    OnLeave,
    /// Covered by sick leave
    Sick,
    /// Assigned hours exceed capacity
    Overloaded,
    /// Some assignments, below the full threshold
    PartiallyBusy,
    /// Worker is inactive
    Unavailable,
}

impl AvailabilityStatus {
    /// Display label used in matrix views.
    pub fn label(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "Available",
            AvailabilityStatus::Assigned => "Assigned",
            AvailabilityStatus::OnLeave => "On leave",
            AvailabilityStatus::Sick => "Sick",
            AvailabilityStatus::Overloaded => "Overloaded",
            AvailabilityStatus::PartiallyBusy => "Partially busy",
            AvailabilityStatus::Unavailable => "Unavailable",
        }
    }

    /// Whether the worker can take more work on such a day.
    pub fn can_take_assignments(&self) -> bool {
        matches!(
            self,
            AvailabilityStatus::Available | AvailabilityStatus::PartiallyBusy
        )
    }
}

/// Project hours booked on a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub project_name: String,
    pub hours: f64,
}

/// Task hours booked on a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    pub task_name: String,
    pub hours: f64,
}

/// Leave covering a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveInfo {
    pub kind: LeaveKind,
    pub half_day: bool,
}

impl LeaveInfo {
    /// Label shown in the matrix cell, e.g. "Sick leave (half day)".
    pub fn display_name(&self) -> String {
        if self.half_day {
            format!("{} (half day)", self.kind.label())
        } else {
            self.kind.label().to_string()
        }
    }
}

/// One worker's availability on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: AvailabilityStatus,
    pub assigned_hours: f64,
    pub max_capacity_hours: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectSlice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskSlice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave: Option<LeaveInfo>,
}

impl DayAvailability {
    /// Assigned hours over capacity; 0 when capacity is 0.
    pub fn utilization(&self) -> f64 {
        if self.max_capacity_hours <= 0.0 {
            0.0
        } else {
            self.assigned_hours / self.max_capacity_hours
        }
    }

    pub fn is_overloaded(&self) -> bool {
        self.assigned_hours > self.max_capacity_hours
    }
}

/// Aggregated hours for one ISO week of a worker's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    /// Monday of the week
    pub week_start: NaiveDate,
    pub total_assigned_hours: f64,
    pub capacity_hours: f64,
    pub utilization: f64,
    /// Distinct projects contributing hours that week
    pub project_count: usize,
    /// Distinct tasks contributing hours that week
    pub task_count: usize,
}

/// One worker's row: every day of the range plus weekly rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerAvailabilityRow {
    pub worker: Worker,
    /// Keyed by day; ordered so serialization is stable
    pub daily: BTreeMap<NaiveDate, DayAvailability>,
    pub weekly: Vec<WeeklyStats>,
}

/// The full matrix for a range: one row per roster worker, in roster order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityMatrix {
    pub range: DateRange,
    pub rows: Vec<WorkerAvailabilityRow>,
    pub computed_at: DateTime<Utc>,
}

impl AvailabilityMatrix {
    /// Look up one worker's row.
    pub fn row(&self, worker_id: i64) -> Option<&WorkerAvailabilityRow> {
        self.rows.iter().find(|r| r.worker.id == worker_id)
    }

    /// Look up one worker's day cell.
    pub fn day(&self, worker_id: i64, date: NaiveDate) -> Option<&DayAvailability> {
        self.row(worker_id).and_then(|r| r.daily.get(&date))
    }

    /// Headline availability counts for the given day.
    pub fn summary(&self, today: NaiveDate) -> AvailabilitySummary {
        let mut available_today = 0;
        let mut on_leave_today = 0;
        let mut sick_today = 0;
        let mut overloaded_today = 0;
        let mut utilization_sum = 0.0;
        let mut utilization_count = 0;

        for row in &self.rows {
            if let Some(day) = row.daily.get(&today) {
                match day.status {
                    AvailabilityStatus::Available => available_today += 1,
                    AvailabilityStatus::OnLeave => on_leave_today += 1,
                    AvailabilityStatus::Sick => sick_today += 1,
                    AvailabilityStatus::Overloaded => overloaded_today += 1,
                    _ => {}
                }
                utilization_sum += day.utilization();
                utilization_count += 1;
            }
        }

        AvailabilitySummary {
            total_workers: self.rows.len(),
            available_today,
            on_leave_today,
            sick_today,
            overloaded_today,
            average_utilization: if utilization_count == 0 {
                0.0
            } else {
                utilization_sum / f64::from(utilization_count)
            },
        }
    }
}

/// Headline counts across the roster for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySummary {
    pub total_workers: usize,
    pub available_today: usize,
    pub on_leave_today: usize,
    pub sick_today: usize,
    pub overloaded_today: usize,
    pub average_utilization: f64,
}

/// Cooperative cancellation handle for long recomputations.
///
/// Cloned tokens share one flag; cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_handles_zero_capacity() {
        let day = DayAvailability {
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            status: AvailabilityStatus::Available,
            assigned_hours: 4.0,
            max_capacity_hours: 0.0,
            projects: Vec::new(),
            tasks: Vec::new(),
            leave: None,
        };
        assert_eq!(day.utilization(), 0.0);
    }

    #[test]
    fn overload_means_assigned_beyond_capacity() {
        let mut day = DayAvailability {
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            status: AvailabilityStatus::Assigned,
            assigned_hours: 8.0,
            max_capacity_hours: 8.0,
            projects: Vec::new(),
            tasks: Vec::new(),
            leave: None,
        };
        assert!(!day.is_overloaded());
        day.assigned_hours = 8.5;
        assert!(day.is_overloaded());
    }

    #[test]
    fn leave_info_display_marks_half_days() {
        let full = LeaveInfo {
            kind: LeaveKind::Vacation,
            half_day: false,
        };
        let half = LeaveInfo {
            kind: LeaveKind::Sick,
            half_day: true,
        };
        assert_eq!(full.display_name(), "Vacation");
        assert_eq!(half.display_name(), "Sick leave (half day)");
    }

    #[test]
    fn cancel_token_clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
