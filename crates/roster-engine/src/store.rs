//! In-memory persistence port, loadable from and dumpable to JSON.
//!
//! Serves as the reference [`SchedulePort`] for tests and as the backing store
//! of the `roster` CLI. Ids are assigned sequentially, starting after the
//! largest id already present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    IntervalFields, IntervalId, ScheduleInterval, SubjectId, Worker, WorkerRole,
};
use crate::port::{PortResult, SchedulePort, WorkerDirectory};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Interval {0} not found")]
    NotFound(IntervalId),

    #[error("Rejected interval: begin {begin} must be before end {end}")]
    InvalidRange { begin: String, end: String },

    #[error("Store file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk layout of a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub intervals: Vec<ScheduleInterval>,
    #[serde(default)]
    pub workers: Vec<Worker>,
}

#[derive(Debug, Clone)]
pub struct InMemoryStore {
    intervals: BTreeMap<IntervalId, ScheduleInterval>,
    workers: Vec<Worker>,
    next_id: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            intervals: BTreeMap::new(),
            workers: Vec::new(),
            next_id: 1,
        }
    }

    /// Build a store from existing records. Records without an id get a fresh one.
    pub fn from_file(file: StoreFile) -> Self {
        let mut store = InMemoryStore::new();
        store.next_id = file
            .intervals
            .iter()
            .filter_map(|i| i.id)
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(1);

        for mut interval in file.intervals {
            let id = match interval.id {
                Some(id) => id,
                None => store.allocate_id(),
            };
            interval.id = Some(id);
            store.intervals.insert(id, interval);
        }
        store.workers = file.workers;
        store
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let file: StoreFile = serde_json::from_str(json)?;
        Ok(InMemoryStore::from_file(file))
    }

    pub fn to_file(&self) -> StoreFile {
        StoreFile {
            intervals: self.intervals.values().cloned().collect(),
            workers: self.workers.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    pub fn add_worker(&mut self, worker: Worker) {
        self.workers.push(worker);
    }

    /// Every stored interval, ordered by id.
    pub fn all_intervals(&self) -> Vec<ScheduleInterval> {
        self.intervals.values().cloned().collect()
    }

    pub fn get(&self, id: IntervalId) -> Option<&ScheduleInterval> {
        self.intervals.get(&id)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    fn allocate_id(&mut self) -> IntervalId {
        let id = IntervalId(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_fields(fields: &IntervalFields) -> Result<(), StoreError> {
        if fields.begin < fields.end {
            return Ok(());
        }
        Err(StoreError::InvalidRange {
            begin: fields.begin.to_string(),
            end: fields.end.to_string(),
        })
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore::new()
    }
}

impl SchedulePort for InMemoryStore {
    fn list_by_subject(&self, subject: SubjectId) -> PortResult<Vec<ScheduleInterval>> {
        Ok(self
            .intervals
            .values()
            .filter(|i| i.subject_id == subject)
            .cloned()
            .collect())
    }

    fn create(&mut self, fields: &IntervalFields) -> PortResult<ScheduleInterval> {
        Self::check_fields(fields)?;
        let id = self.allocate_id();
        let interval = fields.clone().into_interval(id);
        self.intervals.insert(id, interval.clone());
        Ok(interval)
    }

    fn update(&mut self, id: IntervalId, fields: &IntervalFields) -> PortResult<ScheduleInterval> {
        Self::check_fields(fields)?;
        let slot = self.intervals.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        *slot = fields.clone().into_interval(id);
        Ok(slot.clone())
    }

    fn delete(&mut self, id: IntervalId) -> PortResult<()> {
        self.intervals
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id).into())
    }
}

impl WorkerDirectory for InMemoryStore {
    fn list_workers_by_role(&self, role: WorkerRole) -> PortResult<Vec<Worker>> {
        Ok(self
            .workers
            .iter()
            .filter(|w| w.role == role)
            .cloned()
            .collect())
    }
}
