//! # roster-engine
//!
//! Conflict detection and snapshot reconciliation for recurring weekly
//! monitoring schedules.
//!
//! A subject's schedule is a set of weekly slots, each held by a supervising
//! worker. Editing happens on a caller-owned [`WorkingSet`] copied from a
//! [`ScheduleSnapshot`]; on commit the engine validates the edit, rejects it
//! outright on any overlap or missing assignment, and otherwise computes the
//! minimal create/update/delete plan and issues it through a [`SchedulePort`].
//!
//! ## Modules
//!
//! - [`model`] — Weekdays, clock minutes, intervals, snapshots, working sets
//! - [`conflict`] — Grouped pairwise overlap detection (subject and worker scope)
//! - [`reconcile`] — Validation gate, diff into a plan, sequential plan execution
//! - [`port`] — Persistence and worker-directory interfaces
//! - [`store`] — In-memory port implementation with JSON load/dump
//! - [`error`] — Error types

pub mod conflict;
pub mod error;
pub mod model;
pub mod port;
pub mod reconcile;
pub mod store;

pub use conflict::{
    annotate_conflicts, find_clashes, find_worker_double_bookings, has_conflict, overlaps,
    subject_scope, worker_scope, AnnotatedInterval, Clash, ConflictScope,
};
pub use error::{ErrorClass, Phase, ScheduleError};
pub use model::{
    ClockMinute, IntervalFields, IntervalId, ScheduleInterval, ScheduleSnapshot, SubjectId,
    Weekday, Worker, WorkerId, WorkerRole, WorkingSet,
};
pub use port::{SchedulePort, WorkerDirectory};
pub use reconcile::{
    commit, eligible_workers, execute, load_snapshot, reconcile, reconcile_with, ExecutionReport,
    ReconcileOptions, ReconciliationPlan,
};
pub use store::InMemoryStore;
