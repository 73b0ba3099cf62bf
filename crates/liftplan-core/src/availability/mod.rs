//! Worker availability: matrix types and the aggregator.
//!
//! This module provides:
//! - Per-worker, per-day availability cells with statuses and hour slices
//! - The aggregator deriving a matrix from roster + events under a policy
//! - Cooperative cancellation for long recomputations

mod aggregator;
mod matrix;

pub use aggregator::AvailabilityAggregator;
pub(crate) use aggregator::per_day_hours;
pub use matrix::{
    AvailabilityMatrix, AvailabilityStatus, AvailabilitySummary, CancelToken, DayAvailability,
    LeaveInfo, ProjectSlice, TaskSlice, WeeklyStats, WorkerAvailabilityRow,
};
