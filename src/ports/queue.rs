use crate::domain::jobs::JobId;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a job for a background worker
    async fn enqueue_job(&self, job_id: JobId) -> Result<()>;

    /// Wait for the next job. Returns `None` once the queue is closed and drained.
    async fn dequeue_job(&self) -> Option<JobId>;

    /// Stop accepting new jobs; workers exit after draining.
    fn close(&self);
}
