//! Detect overlapping intervals in recurring weekly schedules.
//!
//! Intervals are partitioned into groups by a caller-supplied key function and
//! compared pairwise within each group. Two intervals overlap when
//! `a.begin < b.end && b.begin < a.end`; touching intervals (one ends exactly
//! when the other begins) are NOT conflicts.
//!
//! Two grouping policies are provided:
//!
//! - [`subject_scope`]: one subject's schedule, grouped by weekday. A subject
//!   must never have two overlapping slots on the same day, whoever holds them.
//! - [`worker_scope`]: grouped by `(worker, weekday)`. A worker must never be
//!   booked twice at the same time, across all subjects.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ScheduleError;
use crate::model::{ScheduleInterval, SubjectId, Weekday, WorkerId};

/// A detected conflict between two intervals of the same group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clash {
    pub weekday: Weekday,
    /// The interval that appears first in the input.
    pub first: ScheduleInterval,
    pub second: ScheduleInterval,
    pub overlap_minutes: u16,
}

impl fmt::Display for Clash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} overlaps {} by {} min",
            self.first, self.second, self.overlap_minutes
        )
    }
}

/// An input interval together with whether it takes part in any clash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedInterval {
    #[serde(flatten)]
    pub interval: ScheduleInterval,
    pub conflicting: bool,
}

/// Grouping policy selectable at runtime (e.g. from the CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictScope {
    #[default]
    Subject,
    Worker,
}

impl ConflictScope {
    /// Group key for `interval` under this policy, or `None` when the interval
    /// does not take part in detection.
    pub fn key(self, interval: &ScheduleInterval) -> Option<(Option<WorkerId>, Weekday)> {
        match self {
            ConflictScope::Subject => subject_scope(interval).map(|day| (None, day)),
            ConflictScope::Worker => worker_scope(interval).map(|(w, day)| (Some(w), day)),
        }
    }

    pub fn find_clashes(self, intervals: &[ScheduleInterval]) -> Vec<Clash> {
        find_clashes(intervals, |i| self.key(i))
    }

    pub fn annotate(self, intervals: &[ScheduleInterval]) -> Vec<AnnotatedInterval> {
        annotate_conflicts(intervals, |i| self.key(i))
    }
}

impl FromStr for ConflictScope {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject" | "client" => Ok(ConflictScope::Subject),
            "worker" => Ok(ConflictScope::Worker),
            other => Err(ScheduleError::InvalidValue(format!(
                "unknown conflict scope '{}' (expected subject or worker)",
                other
            ))),
        }
    }
}

/// Subject-scope key: the weekday. Every interval participates.
pub fn subject_scope(interval: &ScheduleInterval) -> Option<Weekday> {
    Some(interval.weekday)
}

/// Worker-scope key: `(worker, weekday)`. Unassigned intervals are skipped.
pub fn worker_scope(interval: &ScheduleInterval) -> Option<(WorkerId, Weekday)> {
    interval.worker_id.map(|worker| (worker, interval.weekday))
}

/// Half-open time overlap test. Ignores weekday and grouping.
pub fn overlaps(a: &ScheduleInterval, b: &ScheduleInterval) -> bool {
    !(a.end <= b.begin || b.end <= a.begin)
}

/// Both intervals carry the same persisted id, i.e. are the same slot.
fn same_identity(a: &ScheduleInterval, b: &ScheduleInterval) -> bool {
    matches!((a.id, b.id), (Some(x), Some(y)) if x == y)
}

fn overlap_minutes(a: &ScheduleInterval, b: &ScheduleInterval) -> u16 {
    let start = a.begin.max(b.begin).minutes();
    let end = a.end.min(b.end).minutes();
    end.saturating_sub(start)
}

/// Partition indices of `intervals` by key, keeping groups in first-seen order.
fn group_indices<K, F>(intervals: &[ScheduleInterval], key: F) -> Vec<Vec<usize>>
where
    K: Eq + Hash,
    F: Fn(&ScheduleInterval) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (index, interval) in intervals.iter().enumerate() {
        let Some(k) = key(interval) else {
            continue;
        };
        let slot = *slots.entry(k).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }

    groups
}

/// Index pairs `(i, j)` with `i < j` that clash, in deterministic order.
fn clashing_pairs<K, F>(intervals: &[ScheduleInterval], key: F) -> Vec<(usize, usize)>
where
    K: Eq + Hash,
    F: Fn(&ScheduleInterval) -> Option<K>,
{
    let mut pairs = Vec::new();

    for group in group_indices(intervals, key) {
        for (pos, &i) in group.iter().enumerate() {
            for &j in &group[pos + 1..] {
                let (a, b) = (&intervals[i], &intervals[j]);
                if !same_identity(a, b) && overlaps(a, b) {
                    pairs.push((i, j));
                }
            }
        }
    }

    pairs
}

/// Find every pair of intervals that share a group key and overlap in time.
pub fn find_clashes<K, F>(intervals: &[ScheduleInterval], key: F) -> Vec<Clash>
where
    K: Eq + Hash,
    F: Fn(&ScheduleInterval) -> Option<K>,
{
    find_clashes_where(intervals, key, |_, _| true)
}

/// Whether any two intervals in the same group overlap.
pub fn has_conflict<K, F>(intervals: &[ScheduleInterval], key: F) -> bool
where
    K: Eq + Hash,
    F: Fn(&ScheduleInterval) -> Option<K>,
{
    group_indices(intervals, key).iter().any(|group| {
        group.iter().enumerate().any(|(pos, &i)| {
            group[pos + 1..].iter().any(|&j| {
                let (a, b) = (&intervals[i], &intervals[j]);
                !same_identity(a, b) && overlaps(a, b)
            })
        })
    })
}

/// Flag each interval that takes part in at least one clash. Output order
/// matches input order.
pub fn annotate_conflicts<K, F>(intervals: &[ScheduleInterval], key: F) -> Vec<AnnotatedInterval>
where
    K: Eq + Hash,
    F: Fn(&ScheduleInterval) -> Option<K>,
{
    let mut flagged = vec![false; intervals.len()];
    for (i, j) in clashing_pairs(intervals, key) {
        flagged[i] = true;
        flagged[j] = true;
    }

    intervals
        .iter()
        .zip(flagged)
        .map(|(interval, conflicting)| AnnotatedInterval {
            interval: interval.clone(),
            conflicting,
        })
        .collect()
}

/// Worker-scope clashes between `candidates` and a roster of existing bookings.
///
/// Bookings that belong to one of the candidates' subjects are ignored: the
/// candidates are the new state of those subjects. Only clashes involving at
/// least one candidate are reported, so pre-existing double bookings between
/// other subjects do not surface here.
pub fn find_worker_double_bookings(
    candidates: &[ScheduleInterval],
    bookings: &[ScheduleInterval],
) -> Vec<Clash> {
    let replaced: HashSet<SubjectId> = candidates.iter().map(|c| c.subject_id).collect();

    let mut combined: Vec<ScheduleInterval> = candidates.to_vec();
    combined.extend(
        bookings
            .iter()
            .filter(|b| !replaced.contains(&b.subject_id))
            .cloned(),
    );

    let candidate_count = candidates.len();
    find_clashes_where(&combined, worker_scope, |i, _| i < candidate_count)
}

fn find_clashes_where<K, F, P>(intervals: &[ScheduleInterval], key: F, keep: P) -> Vec<Clash>
where
    K: Eq + Hash,
    F: Fn(&ScheduleInterval) -> Option<K>,
    P: Fn(usize, usize) -> bool,
{
    clashing_pairs(intervals, key)
        .into_iter()
        .filter(|&(i, j)| keep(i, j))
        .map(|(i, j)| {
            let (a, b) = (&intervals[i], &intervals[j]);
            Clash {
                weekday: a.weekday,
                first: a.clone(),
                second: b.clone(),
                overlap_minutes: overlap_minutes(a, b),
            }
        })
        .collect()
}
