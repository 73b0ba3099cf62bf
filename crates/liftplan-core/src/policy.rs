//! Capacity and move policy for the scheduling engine.
//!
//! All tunable thresholds live here so the aggregator, conflict detector
//! and move validator agree on one set of numbers:
//! - **Capacity**: fallback daily hours when a worker record carries none
//! - **Utilization ladder**: when a day counts as busy / overloaded
//! - **Move rules**: which event types may be backdated or never moved

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::calendar::EventType;

/// Thresholds and rules shared by availability, conflicts and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapacityPolicy {
    /// Daily capacity in hours when the worker has no explicit maximum
    pub default_daily_capacity_hours: f64,
    /// Utilization at or above this counts as fully assigned
    pub full_threshold: f64,
    /// Utilization above this makes an over-capacity conflict High
    pub high_overload_ratio: f64,
    /// Utilization above this makes an over-capacity conflict Critical
    pub critical_overload_ratio: f64,
    /// When true, a move that pushes a worker past capacity is a hard error
    pub forbid_overload: bool,
    /// Slack fraction subtracted before the over-capacity check fires
    pub overflow_tolerance: f64,
    /// Event types allowed to move into the past
    pub backdatable_types: BTreeSet<EventType>,
    /// Event types that refuse moves and block colliding moves
    pub immovable_types: BTreeSet<EventType>,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            default_daily_capacity_hours: 8.0,
            full_threshold: 0.9,
            high_overload_ratio: 1.2,
            critical_overload_ratio: 1.5,
            forbid_overload: false,
            overflow_tolerance: 0.0,
            backdatable_types: BTreeSet::from([EventType::Leave]),
            immovable_types: BTreeSet::from([EventType::Leave]),
        }
    }
}

impl CapacityPolicy {
    /// Create a policy with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the fallback daily capacity
    pub fn with_daily_capacity(mut self, hours: f64) -> Self {
        self.default_daily_capacity_hours = hours;
        self
    }

    /// Override the utilization thresholds (full, high, critical)
    pub fn with_utilization_ladder(mut self, full: f64, high: f64, critical: f64) -> Self {
        self.full_threshold = full;
        self.high_overload_ratio = high;
        self.critical_overload_ratio = critical;
        self
    }

    /// Treat capacity overruns as hard validation errors
    pub fn with_forbid_overload(mut self, forbid: bool) -> Self {
        self.forbid_overload = forbid;
        self
    }

    /// Allow this fraction of slack before over-capacity fires
    pub fn with_overflow_tolerance(mut self, tolerance: f64) -> Self {
        self.overflow_tolerance = tolerance;
        self
    }

    /// Whether an event of this type may be moved into the past
    pub fn is_backdatable(&self, event_type: EventType) -> bool {
        self.backdatable_types.contains(&event_type)
    }

    /// Whether an event of this type refuses moves
    pub fn is_immovable(&self, event_type: EventType) -> bool {
        self.immovable_types.contains(&event_type)
    }

    /// The effective over-capacity limit for a given daily maximum
    pub fn overload_limit(&self, max_capacity_hours: f64) -> f64 {
        max_capacity_hours * (1.0 + self.overflow_tolerance)
    }
}
