//! Background analysis of admitted jobs.
//!
//! Jobs are pushed onto a queue by `submit` and picked up by a fixed pool of
//! workers. Each active job owns a cancellation token so cleanup and shutdown
//! can stop it, and each run is bounded by a wall-clock timeout.

use super::registry::JobRegistry;
use crate::domain::jobs::{JobFiles, JobId, JobStatus, ProgressOutcome};
use crate::domain::report::Report;
use crate::error::{Error, Result};
use crate::ports::analyzer::{AnalysisFailure, AnalysisRequest, Analyzer, ProgressSink};
use crate::ports::queue::JobQueuePort;
use crate::ports::storage::StoragePort;
use crate::sanitize::{sanitize_json, sanitize_message, scrub};
use std::collections::HashMap;
use std::path::{Component, Path};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const CANCELLED_MESSAGE: &str = "Analysis was cancelled";
const CRASHED_MESSAGE: &str = "Analysis failed unexpectedly";
/// Analyzer-internal field pointing at server paths; never shown to clients.
const COMPOSITE_IMAGE_FIELD: &str = "composite_image_path";

pub struct AnalysisRunner {
    registry: Arc<JobRegistry>,
    analyzer: Arc<dyn Analyzer>,
    storage: Arc<dyn StoragePort>,
    queue: Arc<dyn JobQueuePort>,
    active: Mutex<HashMap<JobId, CancellationToken>>,
    shutdown: CancellationToken,
    timeout: Duration,
    secrets: Arc<Vec<String>>,
}

enum RunOutcome {
    Finished(std::result::Result<Report, AnalysisFailure>),
    TimedOut,
    Cancelled,
}

impl AnalysisRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        analyzer: Arc<dyn Analyzer>,
        storage: Arc<dyn StoragePort>,
        queue: Arc<dyn JobQueuePort>,
        timeout: Duration,
        secrets: Vec<String>,
    ) -> Self {
        Self {
            registry,
            analyzer,
            storage,
            queue,
            active: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            timeout,
            secrets: Arc::new(secrets),
        }
    }

    /// Schedules a queued job for analysis. A job can only be submitted once.
    pub async fn submit(&self, id: JobId) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::internal("analysis runner is shutting down"));
        }
        let status = self.registry.get(&id)?.status;
        if status != JobStatus::Queued {
            return Err(Error::Conflict(format!(
                "Job {} is already {}",
                id, status
            )));
        }
        {
            let mut active = self.active();
            if active.contains_key(&id) {
                return Err(Error::Conflict(format!("Job {} is already scheduled", id)));
            }
            active.insert(id, self.shutdown.child_token());
        }

        if let Err(e) = self.queue.enqueue_job(id).await {
            self.active().remove(&id);
            return Err(e);
        }
        debug!("Job {} queued for analysis", id);
        Ok(())
    }

    /// Stops a job if it is scheduled or running. Returns whether it was.
    pub fn cancel(&self, id: &JobId) -> bool {
        match self.active().remove(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    pub fn spawn_workers(self: &Arc<Self>, count: usize) -> Vec<JoinHandle<()>> {
        let handles = (0..count)
            .map(|worker_id| {
                let runner = Arc::clone(self);
                tokio::spawn(async move { runner.run_worker_loop(worker_id).await })
            })
            .collect();
        info!("Started {} analysis workers", count);
        handles
    }

    pub async fn run_worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!("Worker {} started", worker_id);
        loop {
            let id = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = self.queue.dequeue_job() => match next {
                    Some(id) => id,
                    None => break,
                },
            };

            let runner = Arc::clone(&self);
            let handle = tokio::spawn(async move { runner.process_job(id, worker_id).await });
            if let Err(e) = handle.await {
                error!("Worker {} crashed while analyzing job {}: {}", worker_id, id, e);
                self.registry.update(&id, |job| job.fail(CRASHED_MESSAGE));
                self.active().remove(&id);
            }
        }
        debug!("Worker {} stopped", worker_id);
    }

    /// Stops accepting work, cancels everything in flight and lets idle
    /// workers exit.
    pub fn shutdown(&self) {
        info!("Shutting down analysis workers...");
        self.shutdown.cancel();
        self.queue.close();
        for (_, token) in self.active().drain() {
            token.cancel();
        }
    }

    async fn process_job(&self, id: JobId, worker_id: usize) {
        let Some(token) = self.active().get(&id).cloned() else {
            debug!("Job {} was cancelled before it started", id);
            return;
        };

        let (files, duration) = match self.registry.update(&id, |job| {
            job.start().map(|_| (job.files().clone(), job.video_duration()))
        }) {
            Some(Ok(started)) => started,
            Some(Err(e)) => {
                warn!("Worker {} cannot start job {}: {}", worker_id, id, e);
                self.active().remove(&id);
                return;
            }
            None => {
                debug!("Job {} disappeared before it started", id);
                self.active().remove(&id);
                return;
            }
        };
        info!(
            "Worker {} analyzing job {} ({:.1}s of video)",
            worker_id, id, duration
        );

        let request = AnalysisRequest {
            job_id: id,
            video_path: files.video.clone(),
            evidence_dir: files.evidence_dir.clone(),
        };
        let sink: Arc<dyn ProgressSink> = Arc::new(RegistryProgressSink {
            registry: Arc::clone(&self.registry),
            job_id: id,
            secrets: Arc::clone(&self.secrets),
        });

        let outcome = tokio::select! {
            _ = token.cancelled() => RunOutcome::Cancelled,
            result = tokio::time::timeout(
                self.timeout,
                self.analyzer.analyze(request, sink, token.clone()),
            ) => match result {
                Ok(result) => RunOutcome::Finished(result),
                Err(_) => RunOutcome::TimedOut,
            },
        };

        match outcome {
            RunOutcome::Finished(Ok(report)) => {
                let report = self.publish_evidence(report, &files);
                let summary = report.summary_text();
                match self.registry.update(&id, |job| job.complete(report)) {
                    Some(Ok(())) => info!("Job {} completed: {}", id, summary),
                    Some(Err(e)) => warn!("Could not complete job {}: {}", id, e),
                    None => debug!("Discarding result for detached job {}", id),
                }
            }
            RunOutcome::Finished(Err(AnalysisFailure::Cancelled)) | RunOutcome::Cancelled => {
                debug!("Job {} was cancelled", id);
                self.registry.update(&id, |job| job.fail(CANCELLED_MESSAGE));
            }
            RunOutcome::Finished(Err(failure)) => {
                warn!("Analysis of job {} failed: {}", id, failure);
                let message = sanitize_message(&failure.to_string(), &self.secrets);
                self.registry.update(&id, |job| job.fail(message));
            }
            RunOutcome::TimedOut => {
                token.cancel();
                let secs = self.timeout.as_secs();
                warn!("Analysis of job {} timed out after {}s", id, secs);
                self.registry.update(&id, |job| {
                    job.fail(format!("Analysis timed out after {} seconds", secs))
                });
            }
        }

        self.active().remove(&id);
    }

    /// Evidence images are exposed as storage-relative paths. Anything that
    /// points outside the job's evidence directory is dropped, and any other
    /// server path in the report is reduced to its file name.
    fn publish_evidence(&self, mut report: Report, files: &JobFiles) -> Report {
        for map in report.extra_maps_mut() {
            map.remove(COMPOSITE_IMAGE_FIELD);
            for value in map.values_mut() {
                sanitize_json(value, &self.secrets);
            }
        }
        for incident in &mut report.incidents {
            incident.description = scrub(&incident.description, &self.secrets);
            incident.web_image_path = incident
                .web_image_path
                .take()
                .and_then(|raw| self.evidence_path(&raw, &files.evidence_dir));
        }
        report
    }

    fn evidence_path(&self, raw: &str, evidence_dir: &Path) -> Option<String> {
        let raw = Path::new(raw);
        if raw.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }
        let full = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            evidence_dir.join(raw)
        };
        if !full.starts_with(evidence_dir) || full == evidence_dir {
            return None;
        }
        self.storage.relative(&full)
    }

    fn active(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwards analyzer milestones into the registry. Writes for jobs that were
/// cleaned up in the meantime are dropped.
struct RegistryProgressSink {
    registry: Arc<JobRegistry>,
    job_id: JobId,
    secrets: Arc<Vec<String>>,
}

impl ProgressSink for RegistryProgressSink {
    fn report(&self, percentage: i64, step: &str) {
        let step = sanitize_message(step, &self.secrets);
        match self
            .registry
            .update(&self.job_id, |job| job.record_progress(percentage, &step))
        {
            Some(Ok(ProgressOutcome::Applied(pct))) => {
                debug!("Job {} at {}%: {}", self.job_id, pct, step)
            }
            Some(Ok(ProgressOutcome::Stale { current, rejected })) => debug!(
                "Ignoring stale progress {}% for job {} (already at {}%)",
                rejected, self.job_id, current
            ),
            Some(Err(e)) => debug!("Ignoring progress for job {}: {}", self.job_id, e),
            None => debug!("Ignoring progress for detached job {}", self.job_id),
        }
    }
}
