use super::pending::PendingTrims;
use super::registry::JobRegistry;
use super::runner::AnalysisRunner;
use super::validator::UploadValidator;
use crate::domain::jobs::{Job, JobFiles, JobId, VIDEO_FILE};
use crate::domain::upload::ValidationOutcome;
use crate::error::{Error, Result};
use crate::ports::storage::StoragePort;
use crate::ports::trimmer::Trimmer;
use std::sync::Arc;
use tracing::{info, warn};

const TRIM_FAILED: &str = "Failed to trim video";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimmedJob {
    pub job_id: JobId,
    pub duration: f64,
}

/// Cuts a pending over-long upload down to the duration limit and starts
/// analysis of the result under a fresh job id.
pub struct TrimCoordinator {
    storage: Arc<dyn StoragePort>,
    trimmer: Arc<dyn Trimmer>,
    validator: Arc<UploadValidator>,
    registry: Arc<JobRegistry>,
    runner: Arc<AnalysisRunner>,
    pending: Arc<PendingTrims>,
}

impl TrimCoordinator {
    pub fn new(
        storage: Arc<dyn StoragePort>,
        trimmer: Arc<dyn Trimmer>,
        validator: Arc<UploadValidator>,
        registry: Arc<JobRegistry>,
        runner: Arc<AnalysisRunner>,
        pending: Arc<PendingTrims>,
    ) -> Self {
        Self {
            storage,
            trimmer,
            validator,
            registry,
            runner,
            pending,
        }
    }

    pub async fn trim_and_reissue(
        &self,
        original: &JobId,
        temp_video_path: &str,
    ) -> Result<TrimmedJob> {
        let upload = self
            .pending
            .get(original)
            .ok_or_else(|| Error::bad_request("No pending upload for this job"))?;
        if upload.relative_path != temp_video_path.trim() {
            return Err(Error::bad_request(
                "Video path does not match the pending upload",
            ));
        }
        // Lost a race with another trim or a cleanup.
        let upload = self
            .pending
            .take(original)
            .ok_or_else(|| Error::bad_request("No pending upload for this job"))?;

        let id = JobId::new();
        let result = self.trim_into(&id, &upload.video).await;

        if let Err(e) = self.storage.cleanup(original).await {
            warn!("Could not remove original upload {}: {}", original, e);
        }
        if result.is_err() {
            self.registry.delete(&id);
            if let Err(e) = self.storage.cleanup(&id).await {
                warn!("Could not remove failed trim {}: {}", id, e);
            }
        }
        result
    }

    async fn trim_into(&self, id: &JobId, source: &std::path::Path) -> Result<TrimmedJob> {
        let area = self.storage.allocate(id).await?;
        let output = area.join(VIDEO_FILE);
        let max = self.validator.max_duration();

        if let Err(e) = self.trimmer.trim(source, &output, max).await {
            warn!("Trimming into job {} failed: {}", id, e);
            return Err(Error::Trim(TRIM_FAILED.to_string()));
        }

        let duration = match self.validator.validate_trimmed(&output).await {
            ValidationOutcome::Accepted { duration, .. } => duration,
            ValidationOutcome::NeedsTrim { duration, .. } => {
                warn!("Trimmed video {} is still {:.1}s long", id, duration);
                return Err(Error::Trim(TRIM_FAILED.to_string()));
            }
            ValidationOutcome::Rejected(reason) => {
                warn!("Trimmed video {} was rejected: {}", id, reason);
                return Err(Error::Trim(TRIM_FAILED.to_string()));
            }
        };

        self.registry
            .create(Job::new(*id, JobFiles::in_area(&area), duration))?;
        self.runner.submit(*id).await?;
        info!("Trimmed video to {:.1}s as job {}", duration, id);
        Ok(TrimmedJob {
            job_id: *id,
            duration,
        })
    }
}
