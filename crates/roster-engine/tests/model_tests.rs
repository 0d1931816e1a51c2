//! Tests for clock parsing, wire format and working-set editing.

use roster_engine::{
    ClockMinute, IntervalId, ScheduleError, ScheduleInterval, ScheduleSnapshot, SubjectId,
    Weekday, WorkerId, WorkerRole, WorkingSet,
};

#[test]
fn clock_minute_parses_hours_minutes_and_ignores_seconds() {
    assert_eq!(ClockMinute::parse("09:30").unwrap().minutes(), 570);
    assert_eq!(ClockMinute::parse("09:30:45").unwrap().minutes(), 570);
    assert_eq!(ClockMinute::parse("00:00:00").unwrap(), ClockMinute::MIDNIGHT);
    assert_eq!(ClockMinute::parse("23:59:59").unwrap().minutes(), 1439);
}

#[test]
fn clock_minute_rejects_malformed_input() {
    for bad in ["", "24:00", "12:60", "noon", "9", "-01:00"] {
        let err = ClockMinute::parse(bad).unwrap_err();
        assert!(
            matches!(err, ScheduleError::InvalidTime(_)),
            "expected InvalidTime for {:?}, got {:?}",
            bad,
            err
        );
    }
}

#[test]
fn clock_minute_range_is_enforced() {
    assert!(ClockMinute::new(1439).is_ok());
    assert!(ClockMinute::new(1440).is_err());
    assert!(ClockMinute::from_hm(24, 0).is_err());
    assert_eq!(ClockMinute::from_hm(13, 5).unwrap().to_string(), "13:05:00");
}

#[test]
fn weekday_parses_names_and_abbreviations() {
    assert_eq!("MONDAY".parse::<Weekday>().unwrap(), Weekday::Monday);
    assert_eq!("sun".parse::<Weekday>().unwrap(), Weekday::Sunday);
    assert_eq!(" Thursday ".parse::<Weekday>().unwrap(), Weekday::Thursday);
    assert!("funday".parse::<Weekday>().is_err());
}

#[test]
fn weekday_converts_to_and_from_chrono() {
    for day in Weekday::ALL {
        let chrono_day: chrono::Weekday = day.into();
        assert_eq!(Weekday::from(chrono_day), day);
    }
    assert_eq!(Weekday::from(chrono::Weekday::Wed), Weekday::Wednesday);
}

#[test]
fn worker_role_parses_cli_spellings() {
    assert_eq!(
        "surveillance-officer".parse::<WorkerRole>().unwrap(),
        WorkerRole::SurveillanceOfficer
    );
    assert_eq!(
        "CORRECTIONS_OFFICER".parse::<WorkerRole>().unwrap(),
        WorkerRole::CorrectionsOfficer
    );
    assert!("janitor".parse::<WorkerRole>().is_err());
}

#[test]
fn interval_deserializes_from_wire_format() {
    let json = r#"{
        "id": 12,
        "clientId": 3,
        "workerId": 7,
        "weekday": "MONDAY",
        "begin": "09:00:00",
        "ending": "12:00:00"
    }"#;

    let interval: ScheduleInterval = serde_json::from_str(json).unwrap();

    assert_eq!(interval.id, Some(IntervalId(12)));
    assert_eq!(interval.subject_id, SubjectId(3));
    assert_eq!(interval.worker_id, Some(WorkerId(7)));
    assert_eq!(interval.weekday, Weekday::Monday);
    assert_eq!(interval.duration_minutes(), 180);
}

#[test]
fn interval_serializes_times_as_hh_mm_ss() {
    let interval = ScheduleInterval::pending(
        SubjectId(3),
        Weekday::Friday,
        ClockMinute::parse("13:00").unwrap(),
        ClockMinute::parse("15:30").unwrap(),
    );

    let value = serde_json::to_value(&interval).unwrap();

    assert!(value.get("id").is_none(), "pending intervals carry no id");
    assert_eq!(value["subjectId"], 3);
    assert_eq!(value["weekday"], "FRIDAY");
    assert_eq!(value["begin"], "13:00:00");
    assert_eq!(value["ending"], "15:30:00");
    assert!(value["workerId"].is_null());
}

#[test]
fn interval_with_bad_time_fails_to_deserialize() {
    let json = r#"{"subjectId":1,"weekday":"MONDAY","begin":"25:00","ending":"26:00"}"#;
    assert!(serde_json::from_str::<ScheduleInterval>(json).is_err());
}

#[test]
fn check_range_rejects_zero_length_and_inverted() {
    let at = |b: &str, e: &str| {
        ScheduleInterval::pending(
            SubjectId(1),
            Weekday::Monday,
            ClockMinute::parse(b).unwrap(),
            ClockMinute::parse(e).unwrap(),
        )
    };

    assert!(at("09:00", "10:00").check_range(0).is_ok());
    assert!(matches!(
        at("10:00", "10:00").check_range(2),
        Err(ScheduleError::InvalidRange { entry, .. }) if entry.index == 2
    ));
    assert!(at("11:00", "10:00").check_range(0).is_err());
}

#[test]
fn fields_require_a_worker() {
    let interval = ScheduleInterval::pending(
        SubjectId(1),
        Weekday::Monday,
        ClockMinute::parse("09:00").unwrap(),
        ClockMinute::parse("10:00").unwrap(),
    );
    assert!(interval.fields().is_none());

    let fields = interval.with_worker(WorkerId(4)).fields().unwrap();
    assert_eq!(fields.worker_id, WorkerId(4));
    let stored = fields.into_interval(IntervalId(9));
    assert_eq!(stored.id, Some(IntervalId(9)));
    assert_eq!(stored.worker_id, Some(WorkerId(4)));
}

#[test]
fn snapshot_keeps_only_persisted_intervals_of_its_subject() {
    let t = |s: &str| ClockMinute::parse(s).unwrap();
    let own = ScheduleInterval::pending(SubjectId(1), Weekday::Monday, t("09:00"), t("10:00"))
        .with_id(IntervalId(1));
    let other = ScheduleInterval::pending(SubjectId(2), Weekday::Monday, t("09:00"), t("10:00"))
        .with_id(IntervalId(2));
    let unsaved = ScheduleInterval::pending(SubjectId(1), Weekday::Monday, t("11:00"), t("12:00"));

    let snapshot = ScheduleSnapshot::new(SubjectId(1), vec![own.clone(), other, unsaved]);

    assert_eq!(snapshot.intervals(), &[own]);
    assert!(snapshot.get(IntervalId(2)).is_none());
}

#[test]
fn working_set_edits_do_not_touch_the_snapshot() {
    let t = |s: &str| ClockMinute::parse(s).unwrap();
    let snapshot = ScheduleSnapshot::new(
        SubjectId(1),
        vec![
            ScheduleInterval::pending(SubjectId(1), Weekday::Monday, t("09:00"), t("12:00"))
                .with_id(IntervalId(1))
                .with_worker(WorkerId(7)),
        ],
    );
    let mut working = WorkingSet::from_snapshot(&snapshot);

    working.set_times(0, t("09:00"), t("11:00")).unwrap();
    working.assign_worker(0, Some(WorkerId(8))).unwrap();
    let index = working.add_default_slot(Weekday::Tuesday);

    assert_eq!(index, 1);
    assert_eq!(working.len(), 2);
    assert_eq!(working.get(1).unwrap().begin, t("09:00"));
    assert_eq!(working.get(1).unwrap().end, t("17:00"));
    assert!(working.get(1).unwrap().worker_id.is_none());
    assert_eq!(snapshot.intervals()[0].end, t("12:00"));
    assert_eq!(snapshot.intervals()[0].worker_id, Some(WorkerId(7)));

    let removed = working.remove(0).unwrap();
    assert_eq!(removed.id, Some(IntervalId(1)));
    assert!(matches!(working.remove(5), Err(ScheduleError::UnknownEntry(5))));
    assert!(working.set_times(3, t("01:00"), t("02:00")).is_err());
}
