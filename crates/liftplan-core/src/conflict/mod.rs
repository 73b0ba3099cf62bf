//! Conflict model and detection.
//!
//! A conflict is a scheduling problem attached to an event: the same
//! operator booked twice, a day over capacity, a requirement the assigned
//! worker cannot meet, or an assignment overlapping approved leave.
//! Detection is additive; it annotates events and never resolves anything.

mod detector;

pub use detector::{attach_conflicts, ConflictDetector};

use serde::{Deserialize, Serialize};

/// Kind of scheduling conflict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// Same worker on two overlapping assignments that jointly
    /// overcommit a shared day
    DoubleBooking,
    /// A day's assigned hours exceed the worker's capacity
    OverCapacity,
    /// Requirement names a skill the assigned worker lacks
    SkillMismatch,
    /// Assignment overlaps approved leave for the same worker
    LeaveOverlap,
}

/// How serious a conflict is, ordered least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// A detected conflict, attached to the event it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    /// What kind of problem this is
    pub conflict_type: ConflictType,
    /// Severity on the Low..Critical ladder
    pub severity: ConflictSeverity,
    /// Human-readable description naming the workers and dates involved
    pub description: String,
    /// Suggested fix, when one applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// The other event involved, for pairwise conflicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_event_id: Option<String>,
    /// Workers affected by this conflict
    #[serde(default)]
    pub affected_worker_ids: Vec<i64>,
}

impl ConflictInfo {
    /// Whether this conflict demands attention before the schedule ships.
    pub fn is_blocking(&self) -> bool {
        self.severity >= ConflictSeverity::High
    }
}
