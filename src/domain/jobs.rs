use super::report::Report;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// File name of the admitted video inside a job's storage area.
pub const VIDEO_FILE: &str = "video.mp4";
/// Directory inside a job's storage area where the analyzer writes evidence images.
pub const EVIDENCE_DIR: &str = "evidence";

const INITIAL_STEP: &str = "Queued for analysis";
const START_STEP: &str = "Starting analysis";
const COMPLETE_STEP: &str = "Analysis complete";
const GENERIC_FAILURE: &str = "Analysis failed";

/// Opaque handle handed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem locations owned by a job. All of them live inside `area`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFiles {
    pub area: PathBuf,
    pub video: PathBuf,
    pub evidence_dir: PathBuf,
}

impl JobFiles {
    pub fn in_area(area: &Path) -> Self {
        Self {
            area: area.to_path_buf(),
            video: area.join(VIDEO_FILE),
            evidence_dir: area.join(EVIDENCE_DIR),
        }
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Completed(Arc<Report>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a job that is {from}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    Applied(u8),
    /// The reported value was lower than what is already stored.
    Stale { current: u8, rejected: u8 },
}

/// One upload-to-result unit of work.
///
/// State only moves forward: queued -> processing -> completed | error. A
/// terminal job carries exactly one of a report or an error message.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    status: JobStatus,
    progress: u8,
    current_step: String,
    outcome: Option<Outcome>,
    files: JobFiles,
    video_duration: f64,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, files: JobFiles, video_duration: f64) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            current_step: INITIAL_STEP.to_string(),
            outcome: None,
            files,
            video_duration,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn files(&self) -> &JobFiles {
        &self.files
    }

    /// Seconds of video measured at admission.
    pub fn video_duration(&self) -> f64 {
        self.video_duration
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the job reached a terminal state.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn result(&self) -> Option<&Arc<Report>> {
        match &self.outcome {
            Some(Outcome::Completed(report)) => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Failed(message)) => Some(message),
            _ => None,
        }
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.require(JobStatus::Queued, "start")?;
        self.status = JobStatus::Processing;
        self.progress = 0;
        self.current_step = START_STEP.to_string();
        Ok(())
    }

    /// Records a progress milestone. The percentage is clamped to 0..=100 and
    /// values below the stored progress are refused so readers never see it go
    /// backwards.
    pub fn record_progress(
        &mut self,
        percentage: i64,
        step: &str,
    ) -> Result<ProgressOutcome, TransitionError> {
        self.require(JobStatus::Processing, "record progress for")?;
        let clamped = percentage.clamp(0, 100) as u8;
        if clamped < self.progress {
            return Ok(ProgressOutcome::Stale {
                current: self.progress,
                rejected: clamped,
            });
        }
        self.progress = clamped;
        if !step.trim().is_empty() {
            self.current_step = step.trim().to_string();
        }
        Ok(ProgressOutcome::Applied(clamped))
    }

    pub fn complete(&mut self, report: Report) -> Result<(), TransitionError> {
        self.require(JobStatus::Processing, "complete")?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.current_step = COMPLETE_STEP.to_string();
        self.outcome = Some(Outcome::Completed(Arc::new(report)));
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Progress stays frozen at its last accepted value.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.require(JobStatus::Processing, "fail")?;
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        self.status = JobStatus::Error;
        self.current_step = GENERIC_FAILURE.to_string();
        self.outcome = Some(Outcome::Failed(message));
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            status: self.status,
            progress: self.progress,
            current_step: self.current_step.clone(),
            result: self.result().cloned(),
            error: self.error().map(str::to_string),
            files: self.files.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    fn require(&self, expected: JobStatus, action: &'static str) -> Result<(), TransitionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                action,
            })
        }
    }
}

/// Immutable copy of a job taken under its lock.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: String,
    pub result: Option<Arc<Report>>,
    pub error: Option<String>,
    pub files: JobFiles,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
