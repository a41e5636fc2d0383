//! In-memory job registry.
//!
//! The outer map lock is only held long enough to find or insert a job; each
//! job sits behind its own mutex so updates on different ids never wait on
//! each other.

use crate::domain::jobs::{Job, JobId, JobSnapshot};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly built job. Ids are never reused.
    pub fn create(&self, job: Job) -> Result<JobId> {
        let id = job.id();
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&id) {
            return Err(Error::Conflict(format!("Job {} already exists", id)));
        }
        jobs.insert(id, Arc::new(Mutex::new(job)));
        Ok(id)
    }

    pub fn get(&self, id: &JobId) -> Result<JobSnapshot> {
        let job = self.entry(id).ok_or(Error::NotFound)?;
        let job = job.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(job.snapshot())
    }

    /// Runs `f` against the job under its lock. Returns `None` when the job
    /// has been deleted, so late writers become no-ops.
    pub fn update<R>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        let job = self.entry(id)?;
        let mut job = job.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut job))
    }

    pub fn delete(&self, id: &JobId) -> Option<JobSnapshot> {
        let removed = self
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)?;
        let job = removed.lock().unwrap_or_else(PoisonError::into_inner);
        Some(job.snapshot())
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.read().keys().copied().collect()
    }

    /// Ids of jobs that reached a terminal state before `cutoff`.
    pub fn expired(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        let entries: Vec<Arc<Mutex<Job>>> = self.read().values().cloned().collect();
        entries
            .iter()
            .filter_map(|job| {
                let job = job.lock().unwrap_or_else(PoisonError::into_inner);
                job.finished_at()
                    .is_some_and(|finished| finished < cutoff)
                    .then(|| job.id())
            })
            .collect()
    }

    fn entry(&self, id: &JobId) -> Option<Arc<Mutex<Job>>> {
        self.read().get(id).cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, Arc<Mutex<Job>>>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }
}
