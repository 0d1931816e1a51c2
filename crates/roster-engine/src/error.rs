//! Error types for roster-engine operations.

use thiserror::Error;

use crate::conflict::Clash;
use crate::model::{IntervalId, SubjectId, Weekday, WorkerId};
use crate::port::PortError;

/// Which part of a plan execution (or snapshot load) was running when the
/// persistence port failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    Delete,
    Create,
    Update,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Load => "load",
            Phase::Delete => "delete",
            Phase::Create => "create",
            Phase::Update => "update",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`ScheduleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or incomplete input. Raised before any I/O.
    Validation,
    /// Overlapping intervals. Raised before any I/O.
    Conflict,
    /// A port call failed. Earlier operations of the same plan may have been applied.
    Persistence,
}

/// Identifies a working-set entry in error messages: its persisted id when it
/// has one, otherwise its position in the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    pub index: usize,
    pub id: Option<IntervalId>,
}

impl std::fmt::Display for EntryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "interval {} (entry #{})", id, self.index),
            None => write!(f, "new interval (entry #{})", self.index),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid interval {entry} on {weekday}: begin {begin} must be before end {end}")]
    InvalidRange {
        entry: EntryRef,
        weekday: Weekday,
        begin: String,
        end: String,
    },

    #[error("No working-set entry at index {0}")]
    UnknownEntry(usize),

    #[error("{entry} belongs to subject {found}, expected subject {expected}")]
    SubjectMismatch {
        entry: EntryRef,
        expected: SubjectId,
        found: SubjectId,
    },

    #[error("{0} is not part of the loaded snapshot")]
    UnknownIdentity(EntryRef),

    #[error("Interval {0} appears more than once in the working set")]
    DuplicateIdentity(IntervalId),

    #[error("{0} has no worker assigned")]
    MissingWorker(EntryRef),

    #[error("{entry} is assigned to worker {worker}, who may not hold monitoring slots")]
    IneligibleWorker { entry: EntryRef, worker: WorkerId },

    #[error("Schedule conflict: {0}")]
    Conflict(Box<Clash>),

    #[error("Worker double-booked: {0}")]
    WorkerDoubleBooked(Box<Clash>),

    #[error(
        "Persistence failure during {phase} of {} after {applied} applied operation(s): {source}",
        describe_target(.interval, .position)
    )]
    Persistence {
        phase: Phase,
        interval: Option<IntervalId>,
        /// Index of the failing interval within the plan list of its phase
        /// (`to_delete`, `to_create` or `to_update`). Zero for loads.
        position: usize,
        applied: usize,
        #[source]
        source: PortError,
    },
}

fn describe_target(interval: &Option<IntervalId>, position: &usize) -> String {
    match interval {
        Some(id) => format!("interval {}", id),
        None => format!("new interval #{}", position),
    }
}

impl ScheduleError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ScheduleError::Conflict(_) | ScheduleError::WorkerDoubleBooked(_) => {
                ErrorClass::Conflict
            }
            ScheduleError::Persistence { .. } => ErrorClass::Persistence,
            _ => ErrorClass::Validation,
        }
    }

    /// Whether the caller's working set is still a consistent basis for a retry.
    ///
    /// After a persistence failure the caller must reload a fresh snapshot instead.
    pub fn is_recoverable(&self) -> bool {
        self.class() != ErrorClass::Persistence
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
