//! Core error types for liftplan-core.
//!
//! This module defines the error hierarchy using thiserror, mapping the
//! engine's failure families (data integrity, move validation, concurrent
//! modification, lookups) onto typed errors callers can match on.

use thiserror::Error;

/// Core error type for liftplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Inconsistent input data (unknown references, malformed records)
    #[error("Data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    /// A proposed move violates one or more scheduling rules
    #[error("Invalid move: {0}")]
    InvalidMove(#[from] InvalidMoveError),

    /// The event changed between read and write
    #[error("Event '{event_id}' was modified concurrently; reload and retry")]
    ConcurrentModification { event_id: String },

    /// Lookup by id failed
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// A cooperative cancellation token was triggered mid-computation
    #[error("Computation cancelled")]
    Cancelled,

    /// A writer panicked while holding the schedule lock
    #[error("Schedule store lock poisoned")]
    StorePoisoned,

    /// Data provider failure
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Data integrity errors raised while aggregating roster and event data.
#[derive(Error, Debug)]
pub enum DataIntegrityError {
    /// An event references a worker id absent from the roster
    #[error("Event '{event_id}' references unknown worker {worker_id}")]
    UnknownWorker { worker_id: i64, event_id: String },

    /// The roster contains the same worker id twice
    #[error("Duplicate worker id {0} in roster")]
    DuplicateWorkerId(i64),

    /// An event id is already present in the store
    #[error("Duplicate event id '{0}'")]
    DuplicateEventId(String),

    /// A worker record has no usable name
    #[error("Worker {0} has an empty name")]
    MissingWorkerName(i64),

    /// An event window ends before it starts
    #[error("Invalid event window: end ({end}) is before start ({start})")]
    InvalidEventWindow {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
}

/// A rejected move, carrying every violated rule.
#[derive(Error, Debug)]
#[error("move rejected for event '{event_id}': {}", .violations.join("; "))]
pub struct InvalidMoveError {
    pub event_id: String,
    pub violations: Vec<String>,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
