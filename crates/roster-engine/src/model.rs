//! Core data model: weekdays, wall-clock minutes, schedule intervals, snapshots
//! and the caller-owned working set.
//!
//! Time-of-day values cross the wire as `HH:MM:SS` strings and are held
//! internally as minutes since midnight. Seconds are dropped on parse.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EntryRef, Result, ScheduleError};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                $name(value)
            }
        }
    };
}

id_newtype!(
    /// Persisted identity of a schedule interval.
    IntervalId
);
id_newtype!(
    /// The monitored entity a schedule belongs to.
    SubjectId
);
id_newtype!(
    /// The supervising worker assigned to a slot.
    WorkerId
);

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Day of the week. Only used as a grouping and equality key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "MONDAY",
            Weekday::Tuesday => "TUESDAY",
            Weekday::Wednesday => "WEDNESDAY",
            Weekday::Thursday => "THURSDAY",
            Weekday::Friday => "FRIDAY",
            Weekday::Saturday => "SATURDAY",
            Weekday::Sunday => "SUNDAY",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    /// Accepts full names and three-letter abbreviations, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|day| {
                let name = day.as_str().to_ascii_lowercase();
                name == lower || name[..3] == lower
            })
            .ok_or_else(|| ScheduleError::InvalidValue(format!("unknown weekday '{}'", s)))
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }
}

// ---------------------------------------------------------------------------
// ClockMinute
// ---------------------------------------------------------------------------

/// Minutes since midnight, in `[0, 1440)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockMinute(u16);

impl ClockMinute {
    pub const MINUTES_PER_DAY: u16 = 1440;
    pub const MIDNIGHT: ClockMinute = ClockMinute(0);

    pub fn new(minutes: u16) -> Result<Self> {
        if minutes >= Self::MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidTime(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(ClockMinute(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if hour >= 24 || minute >= 60 {
            return Err(ScheduleError::InvalidTime(format!(
                "{:02}:{:02}",
                hour, minute
            )));
        }
        Ok(ClockMinute(hour * 60 + minute))
    }

    /// Parse a `HH:MM` or `HH:MM:SS` wall-clock string. Seconds are ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
            .map_err(|_| ScheduleError::InvalidTime(s.to_string()))?;
        Ok(ClockMinute((time.hour() * 60 + time.minute()) as u16))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for ClockMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:00", self.hour(), self.minute())
    }
}

impl FromStr for ClockMinute {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        ClockMinute::parse(s)
    }
}

impl TryFrom<String> for ClockMinute {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self> {
        ClockMinute::parse(&value)
    }
}

impl From<ClockMinute> for String {
    fn from(value: ClockMinute) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRole {
    SurveillanceOfficer,
    CorrectionsOfficer,
    Manager,
}

impl FromStr for WorkerRole {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "surveillance_officer" => Ok(WorkerRole::SurveillanceOfficer),
            "corrections_officer" => Ok(WorkerRole::CorrectionsOfficer),
            "manager" => Ok(WorkerRole::Manager),
            _ => Err(ScheduleError::InvalidValue(format!(
                "unknown worker role '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub role: WorkerRole,
}

// ---------------------------------------------------------------------------
// ScheduleInterval
// ---------------------------------------------------------------------------

/// A recurring weekly slot: one weekday, a half-open `[begin, end)` time range,
/// the subject it covers, and optionally the worker who holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInterval {
    /// `None` until the interval has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<IntervalId>,
    #[serde(alias = "clientId")]
    pub subject_id: SubjectId,
    #[serde(default)]
    pub worker_id: Option<WorkerId>,
    pub weekday: Weekday,
    pub begin: ClockMinute,
    #[serde(rename = "ending")]
    pub end: ClockMinute,
}

impl ScheduleInterval {
    /// A new, not yet persisted interval with no worker assigned.
    pub fn pending(
        subject_id: SubjectId,
        weekday: Weekday,
        begin: ClockMinute,
        end: ClockMinute,
    ) -> Self {
        ScheduleInterval {
            id: None,
            subject_id,
            worker_id: None,
            weekday,
            begin,
            end,
        }
    }

    pub fn with_id(mut self, id: IntervalId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_worker(mut self, worker: WorkerId) -> Self {
        self.worker_id = Some(worker);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.begin.minutes())
    }

    /// Reject zero-length and inverted ranges. `index` is the entry's position
    /// in its containing collection and is only used for error reporting.
    pub fn check_range(&self, index: usize) -> Result<()> {
        if self.begin < self.end {
            return Ok(());
        }
        Err(ScheduleError::InvalidRange {
            entry: EntryRef { index, id: self.id },
            weekday: self.weekday,
            begin: self.begin.to_string(),
            end: self.end.to_string(),
        })
    }

    /// True when `begin`, `end` and `worker_id` are all equal.
    pub fn same_assignment(&self, other: &ScheduleInterval) -> bool {
        self.begin == other.begin && self.end == other.end && self.worker_id == other.worker_id
    }

    /// The create/update payload for this interval, if a worker is assigned.
    pub fn fields(&self) -> Option<IntervalFields> {
        Some(IntervalFields {
            subject_id: self.subject_id,
            worker_id: self.worker_id?,
            weekday: self.weekday,
            begin: self.begin,
            end: self.end,
        })
    }
}

impl fmt::Display for ScheduleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.id {
            write!(f, "#{} ", id)?;
        }
        write!(
            f,
            "{} {:02}:{:02}-{:02}:{:02}",
            self.weekday,
            self.begin.hour(),
            self.begin.minute(),
            self.end.hour(),
            self.end.minute()
        )?;
        match self.worker_id {
            Some(worker) => write!(f, " (worker {})", worker),
            None => write!(f, " (unassigned)"),
        }
    }
}

/// Payload sent to the persistence port on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalFields {
    pub subject_id: SubjectId,
    pub worker_id: WorkerId,
    pub weekday: Weekday,
    pub begin: ClockMinute,
    #[serde(rename = "ending")]
    pub end: ClockMinute,
}

impl IntervalFields {
    pub fn into_interval(self, id: IntervalId) -> ScheduleInterval {
        ScheduleInterval {
            id: Some(id),
            subject_id: self.subject_id,
            worker_id: Some(self.worker_id),
            weekday: self.weekday,
            begin: self.begin,
            end: self.end,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot and working set
// ---------------------------------------------------------------------------

/// The last-loaded persisted schedule of one subject. Never mutated after capture.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSnapshot {
    subject_id: SubjectId,
    intervals: Vec<ScheduleInterval>,
}

impl ScheduleSnapshot {
    /// Capture a snapshot for `subject_id`.
    ///
    /// Intervals of other subjects and intervals without a persisted id are
    /// dropped: neither can serve as a diff baseline.
    pub fn new(
        subject_id: SubjectId,
        intervals: impl IntoIterator<Item = ScheduleInterval>,
    ) -> Self {
        let intervals = intervals
            .into_iter()
            .filter(|i| i.subject_id == subject_id && i.id.is_some())
            .collect();
        ScheduleSnapshot {
            subject_id,
            intervals,
        }
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    pub fn intervals(&self) -> &[ScheduleInterval] {
        &self.intervals
    }

    pub fn get(&self, id: IntervalId) -> Option<&ScheduleInterval> {
        self.intervals.iter().find(|i| i.id == Some(id))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// A caller-owned, editable copy of a subject's schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingSet {
    subject_id: SubjectId,
    entries: Vec<ScheduleInterval>,
}

impl WorkingSet {
    pub fn new(subject_id: SubjectId) -> Self {
        WorkingSet {
            subject_id,
            entries: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: &ScheduleSnapshot) -> Self {
        WorkingSet {
            subject_id: snapshot.subject_id(),
            entries: snapshot.intervals().to_vec(),
        }
    }

    /// Wrap externally edited entries. Nothing is checked here; the reconciler
    /// validates subject ownership and identities.
    pub fn from_entries(subject_id: SubjectId, entries: Vec<ScheduleInterval>) -> Self {
        WorkingSet {
            subject_id,
            entries,
        }
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    pub fn entries(&self) -> &[ScheduleInterval] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new pending interval and return its index.
    pub fn add(
        &mut self,
        weekday: Weekday,
        begin: ClockMinute,
        end: ClockMinute,
        worker: Option<WorkerId>,
    ) -> usize {
        let mut interval = ScheduleInterval::pending(self.subject_id, weekday, begin, end);
        interval.worker_id = worker;
        self.entries.push(interval);
        self.entries.len() - 1
    }

    /// Append the editor's default slot, 09:00 to 17:00 with no worker.
    pub fn add_default_slot(&mut self, weekday: Weekday) -> usize {
        self.add(weekday, ClockMinute(9 * 60), ClockMinute(17 * 60), None)
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleInterval> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ScheduleInterval> {
        self.entries.get_mut(index)
    }

    pub fn set_times(&mut self, index: usize, begin: ClockMinute, end: ClockMinute) -> Result<()> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(ScheduleError::UnknownEntry(index))?;
        entry.begin = begin;
        entry.end = end;
        Ok(())
    }

    pub fn assign_worker(&mut self, index: usize, worker: Option<WorkerId>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(ScheduleError::UnknownEntry(index))?;
        entry.worker_id = worker;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<ScheduleInterval> {
        if index >= self.entries.len() {
            return Err(ScheduleError::UnknownEntry(index));
        }
        Ok(self.entries.remove(index))
    }
}
