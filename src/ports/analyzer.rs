use crate::domain::jobs::JobId;
use crate::domain::report::Report;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Narrow capability handed to the analyzer for reporting coarse milestones.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percentage: i64, step: &str);
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub job_id: JobId,
    pub video_path: PathBuf,
    /// Directory the analyzer may write evidence images into
    pub evidence_dir: PathBuf,
}

/// Failure signalled by the analyzer. Messages may contain internal detail and
/// are sanitized before they are stored on a job.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisFailure {
    #[error("failed to launch analyzer: {0}")]
    Launch(#[source] io::Error),
    #[error("lost contact with analyzer: {0}")]
    Io(#[source] io::Error),
    #[error("{0}")]
    Collaborator(String),
    #[error("analyzer finished without producing a report")]
    NoReport,
    #[error("analysis was cancelled")]
    Cancelled,
}

/// External analysis engine. Implementations should return promptly once
/// `cancel` fires, but the runner does not rely on it.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        request: AnalysisRequest,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<Report, AnalysisFailure>;
}
