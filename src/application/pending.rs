use crate::domain::jobs::JobId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// An over-long upload waiting for the client to opt into trimming.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub job_id: JobId,
    pub video: PathBuf,
    /// What the client was given and must echo back
    pub relative_path: String,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

impl PendingUpload {
    pub fn new(job_id: JobId, video: PathBuf, relative_path: String, duration: f64) -> Self {
        Self {
            job_id,
            video,
            relative_path,
            duration,
            created_at: Utc::now(),
        }
    }
}

/// Uploads that need trimming. Entries are single use: the trim that
/// consumes one removes it.
#[derive(Default)]
pub struct PendingTrims {
    entries: Mutex<HashMap<JobId, PendingUpload>>,
}

impl PendingTrims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, upload: PendingUpload) {
        self.lock().insert(upload.job_id, upload);
    }

    pub fn get(&self, id: &JobId) -> Option<PendingUpload> {
        self.lock().get(id).cloned()
    }

    pub fn take(&self, id: &JobId) -> Option<PendingUpload> {
        self.lock().remove(id)
    }

    pub fn remove(&self, id: &JobId) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn expired(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        self.lock()
            .values()
            .filter(|upload| upload.created_at < cutoff)
            .map(|upload| upload.job_id)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, PendingUpload>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
