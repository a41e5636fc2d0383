use super::pending::PendingTrims;
use super::registry::JobRegistry;
use super::runner::AnalysisRunner;
use crate::domain::jobs::JobId;
use crate::ports::storage::StoragePort;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Forgets a job and deletes everything it owns. Safe to call any number of
/// times, for any id, in any state.
pub struct CleanupService {
    registry: Arc<JobRegistry>,
    pending: Arc<PendingTrims>,
    runner: Arc<AnalysisRunner>,
    storage: Arc<dyn StoragePort>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub had_job: bool,
    pub had_pending: bool,
    pub was_running: bool,
}

impl CleanupService {
    pub fn new(
        registry: Arc<JobRegistry>,
        pending: Arc<PendingTrims>,
        runner: Arc<AnalysisRunner>,
        storage: Arc<dyn StoragePort>,
    ) -> Self {
        Self {
            registry,
            pending,
            runner,
            storage,
        }
    }

    pub async fn cleanup(&self, id: &JobId) -> CleanupReport {
        // Detach first so a running analysis can no longer publish into it.
        let report = CleanupReport {
            had_job: self.registry.delete(id).is_some(),
            had_pending: self.pending.remove(id),
            was_running: self.runner.cancel(id),
        };

        if let Err(e) = self.storage.cleanup(id).await {
            warn!("Could not remove storage for job {}: {}", id, e);
        }

        if report.had_job || report.had_pending {
            info!("Cleaned up job {}", id);
        } else {
            debug!("Cleanup for unknown job {}", id);
        }
        report
    }

    /// Removes every job and pending upload. Used on shutdown.
    pub async fn cleanup_all(&self) -> usize {
        let ids: HashSet<JobId> = self
            .registry
            .ids()
            .into_iter()
            .chain(self.pending.ids())
            .collect();

        for id in &ids {
            self.cleanup(id).await;
        }
        ids.len()
    }
}
