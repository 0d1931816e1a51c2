//! Tests for the validation gate and snapshot/working-set diffing.

use roster_engine::error::ErrorClass;
use roster_engine::{
    reconcile, reconcile_with, ClockMinute, IntervalId, ReconcileOptions, ScheduleError,
    ScheduleInterval, ScheduleSnapshot, SubjectId, Weekday, WorkerId, WorkingSet,
};

const SUBJECT: SubjectId = SubjectId(5);

fn t(s: &str) -> ClockMinute {
    ClockMinute::parse(s).unwrap()
}

/// A persisted interval of the test subject.
fn stored(id: u64, weekday: Weekday, begin: &str, end: &str, worker: u64) -> ScheduleInterval {
    ScheduleInterval::pending(SUBJECT, weekday, t(begin), t(end))
        .with_id(IntervalId(id))
        .with_worker(WorkerId(worker))
}

fn snapshot_of(intervals: Vec<ScheduleInterval>) -> ScheduleSnapshot {
    ScheduleSnapshot::new(SUBJECT, intervals)
}

#[test]
fn unmodified_copy_yields_empty_plan() {
    let snapshot = snapshot_of(vec![
        stored(1, Weekday::Monday, "09:00", "12:00", 7),
        stored(2, Weekday::Wednesday, "14:00", "18:00", 8),
    ]);
    let working = WorkingSet::from_snapshot(&snapshot);

    let plan = reconcile(&snapshot, &working).unwrap();

    assert!(plan.is_empty());
    assert_eq!(plan.len(), 0);
    assert_eq!(plan.unchanged, 2);
}

#[test]
fn edit_plus_new_slot_yields_one_update_and_one_create() {
    // snapshot = [{id:1, Mon, 09:00-12:00, worker:7}]
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "12:00", 7)]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.set_times(0, t("09:00"), t("11:00")).unwrap();
    working.add(Weekday::Monday, t("13:00"), t("15:00"), Some(WorkerId(7)));

    let plan = reconcile(&snapshot, &working).unwrap();

    assert_eq!(
        plan.to_update,
        vec![stored(1, Weekday::Monday, "09:00", "11:00", 7)]
    );
    assert_eq!(plan.to_create.len(), 1);
    let created = &plan.to_create[0];
    assert_eq!(created.id, None);
    assert_eq!(created.weekday, Weekday::Monday);
    assert_eq!(created.begin, t("13:00"));
    assert_eq!(created.end, t("15:00"));
    assert_eq!(created.worker_id, Some(WorkerId(7)));
    assert!(plan.to_delete.is_empty());
    assert_eq!(plan.unchanged, 0);
}

#[test]
fn overlapping_slots_with_different_workers_are_rejected() {
    let snapshot = snapshot_of(vec![]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.add(Weekday::Monday, t("09:00"), t("11:00"), Some(WorkerId(7)));
    working.add(Weekday::Monday, t("10:00"), t("12:00"), Some(WorkerId(9)));

    let err = reconcile(&snapshot, &working).unwrap_err();

    match &err {
        ScheduleError::Conflict(clash) => {
            assert_eq!(clash.weekday, Weekday::Monday);
            assert_eq!(clash.first.worker_id, Some(WorkerId(7)));
            assert_eq!(clash.second.worker_id, Some(WorkerId(9)));
            assert_eq!(clash.overlap_minutes, 60);
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(err.is_recoverable());
}

#[test]
fn removed_entries_are_deleted() {
    let snapshot = snapshot_of(vec![
        stored(1, Weekday::Monday, "09:00", "12:00", 7),
        stored(2, Weekday::Tuesday, "09:00", "12:00", 7),
        stored(3, Weekday::Friday, "09:00", "12:00", 7),
    ]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.remove(1).unwrap();

    let plan = reconcile(&snapshot, &working).unwrap();

    assert_eq!(plan.to_delete.len(), 1);
    assert_eq!(plan.to_delete[0].id, Some(IntervalId(2)));
    assert!(plan.to_create.is_empty());
    assert!(plan.to_update.is_empty());
    assert_eq!(plan.unchanged, 2);
}

#[test]
fn worker_reassignment_is_an_update() {
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "12:00", 7)]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.assign_worker(0, Some(WorkerId(9))).unwrap();

    let plan = reconcile(&snapshot, &working).unwrap();

    assert_eq!(plan.to_update.len(), 1);
    assert_eq!(plan.to_update[0].worker_id, Some(WorkerId(9)));
}

#[test]
fn weekday_move_becomes_delete_plus_create() {
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "12:00", 7)]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.get_mut(0).unwrap().weekday = Weekday::Thursday;

    let plan = reconcile(&snapshot, &working).unwrap();

    assert_eq!(plan.to_delete, vec![snapshot.intervals()[0].clone()]);
    assert_eq!(plan.to_create.len(), 1);
    assert_eq!(plan.to_create[0].id, None);
    assert_eq!(plan.to_create[0].weekday, Weekday::Thursday);
    assert!(plan.to_update.is_empty());
}

#[test]
fn moving_a_slot_into_a_freed_time_is_not_a_conflict() {
    // Delete + shrink + add into the freed range in one edit
    let snapshot = snapshot_of(vec![
        stored(1, Weekday::Monday, "09:00", "12:00", 7),
        stored(2, Weekday::Monday, "12:00", "14:00", 8),
    ]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.remove(1).unwrap();
    working.set_times(0, t("09:00"), t("10:00")).unwrap();
    working.add(Weekday::Monday, t("10:00"), t("14:00"), Some(WorkerId(8)));

    let plan = reconcile(&snapshot, &working).unwrap();

    assert_eq!(plan.to_delete.len(), 1);
    assert_eq!(plan.to_update.len(), 1);
    assert_eq!(plan.to_create.len(), 1);
}

#[test]
fn missing_worker_on_new_slot_is_a_validation_error() {
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "12:00", 7)]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    let index = working.add_default_slot(Weekday::Tuesday);

    let err = reconcile(&snapshot, &working).unwrap_err();

    match err {
        ScheduleError::MissingWorker(entry) => {
            assert_eq!(entry.index, index);
            assert_eq!(entry.id, None);
        }
        other => panic!("expected MissingWorker, got {:?}", other),
    }
}

#[test]
fn missing_worker_on_updated_slot_is_a_validation_error() {
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "12:00", 7)]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.assign_worker(0, None).unwrap();

    let err = reconcile(&snapshot, &working).unwrap_err();

    assert!(matches!(err, ScheduleError::MissingWorker(e) if e.id == Some(IntervalId(1))));
    assert_eq!(err.class(), ErrorClass::Validation);
}

#[test]
fn conflict_is_reported_before_missing_worker() {
    let snapshot = snapshot_of(vec![]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.add_default_slot(Weekday::Monday);
    working.add_default_slot(Weekday::Monday);

    let err = reconcile(&snapshot, &working).unwrap_err();

    assert!(matches!(err, ScheduleError::Conflict(_)));
}

#[test]
fn zero_length_interval_is_rejected_before_conflict_checks() {
    let snapshot = snapshot_of(vec![]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.add(Weekday::Monday, t("10:00"), t("10:00"), Some(WorkerId(1)));
    working.add(Weekday::Monday, t("09:00"), t("12:00"), Some(WorkerId(1)));

    let err = reconcile(&snapshot, &working).unwrap_err();

    assert!(matches!(err, ScheduleError::InvalidRange { entry, .. } if entry.index == 0));
}

#[test]
fn entries_of_another_subject_are_rejected() {
    let snapshot = snapshot_of(vec![]);
    let foreign =
        ScheduleInterval::pending(SubjectId(99), Weekday::Monday, t("09:00"), t("10:00"))
            .with_worker(WorkerId(1));
    let working = WorkingSet::from_entries(SUBJECT, vec![foreign]);

    let err = reconcile(&snapshot, &working).unwrap_err();

    assert!(matches!(
        err,
        ScheduleError::SubjectMismatch { expected, found, .. }
            if expected == SUBJECT && found == SubjectId(99)
    ));
}

#[test]
fn unknown_and_duplicate_identities_are_rejected() {
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "10:00", 7)]);

    let stale = WorkingSet::from_entries(
        SUBJECT,
        vec![stored(42, Weekday::Monday, "09:00", "10:00", 7)],
    );
    assert!(matches!(
        reconcile(&snapshot, &stale).unwrap_err(),
        ScheduleError::UnknownIdentity(e) if e.id == Some(IntervalId(42))
    ));

    let duplicated = WorkingSet::from_entries(
        SUBJECT,
        vec![
            stored(1, Weekday::Monday, "09:00", "10:00", 7),
            stored(1, Weekday::Monday, "11:00", "12:00", 7),
        ],
    );
    assert!(matches!(
        reconcile(&snapshot, &duplicated).unwrap_err(),
        ScheduleError::DuplicateIdentity(IntervalId(1))
    ));
}

#[test]
fn worker_bookings_on_other_subjects_block_double_booking() {
    let snapshot = snapshot_of(vec![]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.add(Weekday::Tuesday, t("08:00"), t("10:00"), Some(WorkerId(3)));

    let elsewhere =
        ScheduleInterval::pending(SubjectId(6), Weekday::Tuesday, t("09:00"), t("11:00"))
            .with_id(IntervalId(50))
            .with_worker(WorkerId(3));
    let options = ReconcileOptions::default().with_worker_bookings(vec![elsewhere]);

    let err = reconcile_with(&snapshot, &working, &options).unwrap_err();

    match err {
        ScheduleError::WorkerDoubleBooked(clash) => {
            assert_eq!(clash.second.id, Some(IntervalId(50)));
            assert_eq!(clash.overlap_minutes, 60);
        }
        other => panic!("expected WorkerDoubleBooked, got {:?}", other),
    }

    // Same booking, different worker: accepted
    let mut other_worker = working.clone();
    other_worker.assign_worker(0, Some(WorkerId(4))).unwrap();
    assert!(reconcile_with(&snapshot, &other_worker, &options).is_ok());
}

#[test]
fn ineligible_worker_is_rejected_when_roster_is_restricted() {
    let snapshot = snapshot_of(vec![stored(1, Weekday::Monday, "09:00", "10:00", 7)]);
    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.add(Weekday::Friday, t("09:00"), t("10:00"), Some(WorkerId(11)));

    let options = ReconcileOptions::default().with_eligible_workers([WorkerId(7)]);
    let err = reconcile_with(&snapshot, &working, &options).unwrap_err();

    assert!(matches!(
        err,
        ScheduleError::IneligibleWorker { worker: WorkerId(11), .. }
    ));

    // Untouched entries are not re-checked: worker 7 is eligible anyway, and
    // removing the new slot leaves nothing to write.
    working.remove(1).unwrap();
    assert!(reconcile_with(&snapshot, &working, &options).unwrap().is_empty());
}

#[test]
fn untouched_slots_are_not_checked_against_worker_bookings() {
    // Slot 1 already overlaps worker 7's booking on subject 2
    let snapshot = snapshot_of(vec![
        stored(1, Weekday::Monday, "09:00", "12:00", 7),
        stored(2, Weekday::Tuesday, "09:00", "10:00", 7),
    ]);
    let booking =
        ScheduleInterval::pending(SubjectId(2), Weekday::Monday, t("10:00"), t("11:00"))
            .with_id(IntervalId(10))
            .with_worker(WorkerId(7));
    let options = ReconcileOptions::default().with_worker_bookings(vec![booking]);

    let mut working = WorkingSet::from_snapshot(&snapshot);
    working.remove(1).unwrap();
    let plan = reconcile_with(&snapshot, &working, &options).unwrap();
    assert_eq!(plan.to_delete.len(), 1);
    assert_eq!(plan.unchanged, 1);

    // Editing the overlapping slot itself is still checked
    working.set_times(0, t("09:00"), t("10:30")).unwrap();
    assert!(matches!(
        reconcile_with(&snapshot, &working, &options).unwrap_err(),
        ScheduleError::WorkerDoubleBooked(_)
    ));
}
