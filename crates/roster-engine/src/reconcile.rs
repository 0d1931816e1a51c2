//! Reconcile an edited working set against its snapshot and apply the result.
//!
//! [`reconcile`] classifies every entry by identity into creates, updates and
//! deletes, after a validation gate that rejects the whole edit on any range,
//! identity, conflict or assignment problem. Nothing touches the port until the
//! gate has passed.
//!
//! [`execute`] issues the plan against a [`SchedulePort`] one call at a time:
//! deletes first, then creates, then updates. Execution is not transactional.
//! When a call fails the error reports the phase, the interval and how many
//! operations had already been applied; those are not rolled back.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::conflict::{find_clashes, find_worker_double_bookings, subject_scope};
use crate::error::{EntryRef, Phase, Result, ScheduleError};
use crate::model::{
    IntervalId, ScheduleInterval, ScheduleSnapshot, SubjectId, WorkerId, WorkerRole, WorkingSet,
};
use crate::port::{PortError, SchedulePort, WorkerDirectory};

/// Optional extra gates for [`reconcile_with`].
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Intervals of other subjects. When non-empty, the working set is also
    /// checked for worker double-bookings against them.
    pub worker_bookings: Vec<ScheduleInterval>,
    /// When set, every created or updated interval must be held by one of these workers.
    pub eligible_workers: Option<BTreeSet<WorkerId>>,
}

impl ReconcileOptions {
    pub fn with_worker_bookings(mut self, bookings: Vec<ScheduleInterval>) -> Self {
        self.worker_bookings = bookings;
        self
    }

    pub fn with_eligible_workers(mut self, workers: impl IntoIterator<Item = WorkerId>) -> Self {
        self.eligible_workers = Some(workers.into_iter().collect());
        self
    }
}

/// The minimal set of port operations that turns the snapshot into the working set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPlan {
    pub subject_id: SubjectId,
    pub to_delete: Vec<ScheduleInterval>,
    pub to_create: Vec<ScheduleInterval>,
    pub to_update: Vec<ScheduleInterval>,
    /// Persisted entries carried over without changes.
    pub unchanged: usize,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty() && self.to_update.is_empty()
    }

    /// Number of port calls the plan will issue.
    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_create.len() + self.to_update.len()
    }
}

/// What was applied by a successful [`execute`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub deleted: Vec<IntervalId>,
    pub created: Vec<ScheduleInterval>,
    pub updated: Vec<ScheduleInterval>,
}

impl ExecutionReport {
    pub fn applied(&self) -> usize {
        self.deleted.len() + self.created.len() + self.updated.len()
    }
}

/// How a single working-set entry relates to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Create,
    Update,
    /// Same identity, different weekday: delete the old slot, create a new one.
    Move,
    Keep,
}

impl Action {
    fn writes(self) -> bool {
        !matches!(self, Action::Keep)
    }
}

fn classify(snapshot: &ScheduleSnapshot, entry: &ScheduleInterval) -> Action {
    let Some(id) = entry.id else {
        return Action::Create;
    };
    match snapshot.get(id) {
        Some(original) if original.weekday != entry.weekday => Action::Move,
        Some(original) if original.same_assignment(entry) => Action::Keep,
        _ => Action::Update,
    }
}

/// Diff `working` against `snapshot` with the default gates.
pub fn reconcile(snapshot: &ScheduleSnapshot, working: &WorkingSet) -> Result<ReconciliationPlan> {
    reconcile_with(snapshot, working, &ReconcileOptions::default())
}

/// Diff `working` against `snapshot`, applying the validation gate first.
///
/// # Errors
///
/// Any of the validation or conflict variants of [`ScheduleError`]. On error the
/// working set is untouched and nothing has been sent anywhere.
pub fn reconcile_with(
    snapshot: &ScheduleSnapshot,
    working: &WorkingSet,
    options: &ReconcileOptions,
) -> Result<ReconciliationPlan> {
    let subject = snapshot.subject_id();
    let entries = working.entries();

    let rejected = |err: ScheduleError| {
        warn!(subject = %subject, error = %err, "schedule edit rejected");
        err
    };

    for (index, entry) in entries.iter().enumerate() {
        if entry.subject_id != subject {
            return Err(rejected(ScheduleError::SubjectMismatch {
                entry: EntryRef { index, id: entry.id },
                expected: subject,
                found: entry.subject_id,
            }));
        }
        entry.check_range(index).map_err(rejected)?;
    }

    let mut seen: HashSet<IntervalId> = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let Some(id) = entry.id else {
            continue;
        };
        if snapshot.get(id).is_none() {
            return Err(rejected(ScheduleError::UnknownIdentity(EntryRef {
                index,
                id: Some(id),
            })));
        }
        if !seen.insert(id) {
            return Err(rejected(ScheduleError::DuplicateIdentity(id)));
        }
    }

    if let Some(clash) = find_clashes(entries, subject_scope).into_iter().next() {
        return Err(rejected(ScheduleError::Conflict(Box::new(clash))));
    }

    let actions: Vec<Action> = entries.iter().map(|e| classify(snapshot, e)).collect();

    // Only slots being written are checked against other subjects' bookings;
    // an untouched slot never blocks an unrelated edit.
    if !options.worker_bookings.is_empty() {
        let written: Vec<ScheduleInterval> = entries
            .iter()
            .zip(&actions)
            .filter(|(_, action)| action.writes())
            .map(|(entry, _)| entry.clone())
            .collect();
        let others: Vec<ScheduleInterval> = options
            .worker_bookings
            .iter()
            .filter(|b| b.subject_id != subject)
            .cloned()
            .collect();
        let double_booked = find_worker_double_bookings(&written, &others);
        if let Some(clash) = double_booked.into_iter().next() {
            return Err(rejected(ScheduleError::WorkerDoubleBooked(Box::new(clash))));
        }
    }

    for (index, (entry, action)) in entries.iter().zip(&actions).enumerate() {
        if !action.writes() {
            continue;
        }
        let entry_ref = EntryRef { index, id: entry.id };
        let Some(worker) = entry.worker_id else {
            return Err(rejected(ScheduleError::MissingWorker(entry_ref)));
        };
        if let Some(eligible) = &options.eligible_workers {
            if !eligible.contains(&worker) {
                return Err(rejected(ScheduleError::IneligibleWorker {
                    entry: entry_ref,
                    worker,
                }));
            }
        }
    }

    let mut plan = ReconciliationPlan {
        subject_id: subject,
        to_delete: Vec::new(),
        to_create: Vec::new(),
        to_update: Vec::new(),
        unchanged: 0,
    };
    let mut retained: HashSet<IntervalId> = HashSet::new();

    for (entry, action) in entries.iter().zip(actions) {
        match action {
            Action::Create => plan.to_create.push(entry.clone()),
            Action::Move => {
                debug!(interval = %entry, "weekday changed, recreating slot");
                plan.to_create.push(ScheduleInterval {
                    id: None,
                    ..entry.clone()
                });
            }
            Action::Update => {
                retained.extend(entry.id);
                plan.to_update.push(entry.clone());
            }
            Action::Keep => {
                retained.extend(entry.id);
                plan.unchanged += 1;
            }
        }
    }

    plan.to_delete = snapshot
        .intervals()
        .iter()
        .filter(|original| !original.id.is_some_and(|id| retained.contains(&id)))
        .cloned()
        .collect();

    info!(
        subject = %subject,
        delete = plan.to_delete.len(),
        create = plan.to_create.len(),
        update = plan.to_update.len(),
        unchanged = plan.unchanged,
        "reconciliation plan computed"
    );

    Ok(plan)
}

/// Check that every write in `plan` can be issued: creates and updates carry a
/// worker, updates and deletes carry an id.
fn check_plan(plan: &ReconciliationPlan) -> Result<()> {
    for (index, interval) in plan.to_create.iter().enumerate() {
        if interval.worker_id.is_none() {
            return Err(ScheduleError::MissingWorker(EntryRef { index, id: None }));
        }
    }
    for (index, interval) in plan.to_update.iter().enumerate() {
        let entry = EntryRef {
            index,
            id: interval.id,
        };
        if interval.id.is_none() {
            return Err(ScheduleError::UnknownIdentity(entry));
        }
        if interval.worker_id.is_none() {
            return Err(ScheduleError::MissingWorker(entry));
        }
    }
    for (index, interval) in plan.to_delete.iter().enumerate() {
        if interval.id.is_none() {
            return Err(ScheduleError::UnknownIdentity(EntryRef { index, id: None }));
        }
    }
    Ok(())
}

fn persistence_failure(
    phase: Phase,
    interval: Option<IntervalId>,
    position: usize,
    applied: usize,
    source: PortError,
) -> ScheduleError {
    warn!(%phase, ?interval, position, applied, error = %source, "persistence port call failed");
    ScheduleError::Persistence {
        phase,
        interval,
        position,
        applied,
        source,
    }
}

/// Apply `plan` through `port`: deletes, then creates, then updates.
///
/// Calls are issued sequentially and each must complete before the next. On
/// the first failing call execution stops and [`ScheduleError::Persistence`] is
/// returned. Operations applied before the failure stay applied; the caller
/// should reload a fresh snapshot.
pub fn execute<P>(plan: &ReconciliationPlan, port: &mut P) -> Result<ExecutionReport>
where
    P: SchedulePort + ?Sized,
{
    check_plan(plan)?;

    let mut report = ExecutionReport::default();

    for (position, interval) in plan.to_delete.iter().enumerate() {
        let Some(id) = interval.id else {
            continue;
        };
        debug!(%id, "deleting interval");
        port.delete(id).map_err(|e| {
            persistence_failure(Phase::Delete, Some(id), position, report.applied(), e)
        })?;
        report.deleted.push(id);
    }

    for (position, interval) in plan.to_create.iter().enumerate() {
        let Some(fields) = interval.fields() else {
            continue;
        };
        debug!(%interval, "creating interval");
        let created = port.create(&fields).map_err(|e| {
            persistence_failure(Phase::Create, None, position, report.applied(), e)
        })?;
        report.created.push(created);
    }

    for (position, interval) in plan.to_update.iter().enumerate() {
        let (Some(id), Some(fields)) = (interval.id, interval.fields()) else {
            continue;
        };
        debug!(%interval, "updating interval");
        let updated = port.update(id, &fields).map_err(|e| {
            persistence_failure(Phase::Update, Some(id), position, report.applied(), e)
        })?;
        report.updated.push(updated);
    }

    info!(
        subject = %plan.subject_id,
        deleted = report.deleted.len(),
        created = report.created.len(),
        updated = report.updated.len(),
        "schedule plan applied"
    );

    Ok(report)
}

/// Reconcile and, if the gate passes, execute in one step.
pub fn commit<P>(
    snapshot: &ScheduleSnapshot,
    working: &WorkingSet,
    options: &ReconcileOptions,
    port: &mut P,
) -> Result<ExecutionReport>
where
    P: SchedulePort + ?Sized,
{
    let plan = reconcile_with(snapshot, working, options)?;
    if plan.is_empty() {
        debug!(subject = %plan.subject_id, "nothing to apply");
        return Ok(ExecutionReport::default());
    }
    execute(&plan, port)
}

/// Load the current persisted schedule of `subject` as a diff baseline.
pub fn load_snapshot<P>(port: &P, subject: SubjectId) -> Result<ScheduleSnapshot>
where
    P: SchedulePort + ?Sized,
{
    let intervals = port
        .list_by_subject(subject)
        .map_err(|e| persistence_failure(Phase::Load, None, 0, 0, e))?;
    let snapshot = ScheduleSnapshot::new(subject, intervals);
    debug!(subject = %subject, intervals = snapshot.len(), "snapshot loaded");
    Ok(snapshot)
}

/// Ids of all workers with `role`, for [`ReconcileOptions::eligible_workers`].
pub fn eligible_workers<D>(directory: &D, role: WorkerRole) -> Result<BTreeSet<WorkerId>>
where
    D: WorkerDirectory + ?Sized,
{
    let workers = directory
        .list_workers_by_role(role)
        .map_err(|e| persistence_failure(Phase::Load, None, 0, 0, e))?;
    Ok(workers.into_iter().map(|w| w.id).collect())
}
