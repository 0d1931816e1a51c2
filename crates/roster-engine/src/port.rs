//! Collaborator interfaces the engine depends on.
//!
//! The persistence port stands in for whatever remote CRUD transport holds the
//! schedules. Each call is independent; the engine never assumes a batch or a
//! transaction is available.

use crate::model::{
    IntervalFields, IntervalId, ScheduleInterval, SubjectId, Worker, WorkerRole,
};

/// Error type returned by port implementations.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

pub type PortResult<T> = std::result::Result<T, PortError>;

/// Remote create/read/update/delete interface for schedule intervals.
pub trait SchedulePort {
    /// All persisted intervals of one subject.
    fn list_by_subject(&self, subject: SubjectId) -> PortResult<Vec<ScheduleInterval>>;

    /// Persist a new interval and return it with its assigned id.
    fn create(&mut self, fields: &IntervalFields) -> PortResult<ScheduleInterval>;

    /// Overwrite the fields of an existing interval.
    fn update(&mut self, id: IntervalId, fields: &IntervalFields) -> PortResult<ScheduleInterval>;

    fn delete(&mut self, id: IntervalId) -> PortResult<()>;
}

/// Lookup of workers, used to decide who may hold monitoring slots.
pub trait WorkerDirectory {
    fn list_workers_by_role(&self, role: WorkerRole) -> PortResult<Vec<Worker>>;
}
