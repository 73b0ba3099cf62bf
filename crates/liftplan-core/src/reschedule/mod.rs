//! Two-phase rescheduling: dry-run validation and atomic application.
//!
//! This module provides:
//! - `MoveValidator`: non-mutating rule evaluation for a proposed move
//! - `ScheduleStore`: the serialized writer that re-validates inside its
//!   lock before committing, then refreshes availability and conflicts
//!   for the touched window

mod store;
mod validator;

pub use store::{AssignmentDecision, MoveOutcome, RecomputeScope, ScheduleSnapshot, ScheduleStore};
pub use validator::{MoveRequest, MoveValidator, ValidationResult};
