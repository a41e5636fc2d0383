use crate::domain::jobs::JobId;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// Per-job scratch areas. Each area belongs to exactly one job.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Create the job's area (and its evidence directory) and return its root
    async fn allocate(&self, job_id: &JobId) -> io::Result<PathBuf>;

    /// Recursively delete the job's area. Deleting a missing area succeeds.
    async fn cleanup(&self, job_id: &JobId) -> io::Result<()>;

    /// Root of the job's area, without touching the filesystem
    fn area(&self, job_id: &JobId) -> PathBuf;

    /// Client-facing form of a path inside the storage root
    fn relative(&self, path: &Path) -> Option<String>;

    /// Map a client-facing path back to an absolute one, refusing anything
    /// that could escape the storage root
    fn resolve(&self, relative: &str) -> Option<PathBuf>;
}
