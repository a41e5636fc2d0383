use super::cleanup::CleanupService;
use super::pending::PendingTrims;
use super::registry::JobRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically removes finished jobs and pending uploads that nobody
/// collected within the retention window.
pub struct Janitor {
    registry: Arc<JobRegistry>,
    pending: Arc<PendingTrims>,
    cleanup: Arc<CleanupService>,
    ttl: Duration,
    interval: Duration,
}

impl Janitor {
    pub fn new(
        registry: Arc<JobRegistry>,
        pending: Arc<PendingTrims>,
        cleanup: Arc<CleanupService>,
        ttl: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            pending,
            cleanup,
            ttl,
            interval,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        debug!("Janitor started, sweeping every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Janitor stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = self.sweep_once(Utc::now()).await;
                    if removed > 0 {
                        info!("Janitor removed {} stale jobs", removed);
                    }
                }
            }
        }
    }

    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return 0;
        };

        let mut stale = self.registry.expired(cutoff);
        stale.extend(self.pending.expired(cutoff));
        for id in &stale {
            self.cleanup.cleanup(id).await;
        }
        stale.len()
    }
}
