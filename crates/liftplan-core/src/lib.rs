//! # Liftplan Core Library
//!
//! This library provides the scheduling engine behind the Liftplan staffing
//! calendar for crane crews. It implements a CLI-first philosophy where all
//! operations are available via a standalone CLI binary, with any GUI being
//! a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Calendar**: The unified `CalendarEvent` model covering tasks, leave,
//!   deadlines and milestones, with filtering and summary rollups
//! - **Availability**: Deterministic per-worker, per-day aggregation of
//!   assignments and leave into an availability matrix
//! - **Conflicts**: A pure detector for double-bookings, over-capacity days,
//!   skill mismatches and leave overlaps; it only ever reports, never fixes
//! - **Reschedule**: Non-mutating move validation plus an atomic applier
//!   that re-validates inside the write lock and recomputes only what a
//!   committed move touched
//! - **Assignment**: Ranked worker suggestions scored on skills,
//!   availability and conflict freedom
//!
//! ## Key Components
//!
//! - [`ScheduleStore`]: Serialized writer over the loaded schedule range
//! - [`AvailabilityAggregator`]: Builds the worker availability matrix
//! - [`ConflictDetector`]: Derives conflicts from the current event set
//! - [`CalendarDataProvider`]: Trait for persistence and transport layers

pub mod assignment;
pub mod availability;
pub mod calendar;
pub mod conflict;
pub mod error;
pub mod policy;
pub mod provider;
pub mod reschedule;
pub mod roster;

pub use assignment::{AssignmentAdvisor, AssignmentSuggestion, SkillMatch};
pub use availability::{
    AvailabilityAggregator, AvailabilityMatrix, AvailabilityStatus, AvailabilitySummary,
    CancelToken, DayAvailability, WorkerAvailabilityRow,
};
pub use calendar::{
    critical_conflicts, events_on, upcoming_deadlines, CalendarEvent, CalendarSummary, DateRange,
    EventFilter, EventPriority, EventStatus, EventType, LeaveKind, RelatedEntities,
    ResourceRequirement,
};
pub use conflict::{ConflictDetector, ConflictInfo, ConflictSeverity, ConflictType};
pub use error::{CoreError, DataIntegrityError, InvalidMoveError, Result};
pub use policy::CapacityPolicy;
pub use provider::{
    AssignmentOutcome, CalendarBundle, CalendarDataProvider, EventDraft, FetchRequest,
    InMemoryCalendarProvider,
};
pub use reschedule::{
    AssignmentDecision, MoveOutcome, MoveRequest, MoveValidator, RecomputeScope, ScheduleSnapshot,
    ScheduleStore, ValidationResult,
};
pub use roster::{SkillLevel, Worker, WorkerSkill};
