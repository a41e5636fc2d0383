//! Wiring of adapters and services into a running application.

use crate::adapters::http::{self, AppState, PollLimiter};
use crate::adapters::local::{ChannelQueue, CommandAnalyzer, FfmpegTrimmer, FsAdapter};
use crate::application::cleanup::CleanupService;
use crate::application::intake::IntakeService;
use crate::application::janitor::Janitor;
use crate::application::pending::PendingTrims;
use crate::application::registry::JobRegistry;
use crate::application::runner::AnalysisRunner;
use crate::application::trim::TrimCoordinator;
use crate::application::validator::UploadValidator;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::ports::analyzer::Analyzer;
use crate::ports::probe::MediaProbe;
use crate::ports::storage::StoragePort;
use crate::ports::trimmer::Trimmer;
use axum::Router;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// External tools the services depend on.
pub struct Collaborators {
    pub probe: Arc<dyn MediaProbe>,
    pub trimmer: Arc<dyn Trimmer>,
    pub analyzer: Arc<dyn Analyzer>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let analyzer = CommandAnalyzer::from_config(&config.analyzer)
            .ok_or_else(|| Error::internal("ANALYZER_CMD must be set"))?;

        #[cfg(feature = "ffmpeg")]
        let probe: Arc<dyn MediaProbe> = Arc::new(crate::adapters::local::ffmpeg_probe::FfmpegProbe);
        #[cfg(not(feature = "ffmpeg"))]
        let probe: Arc<dyn MediaProbe> =
            Arc::new(crate::adapters::local::FfprobeProbe::new(&config.ffprobe_path));

        Ok(Self {
            probe,
            trimmer: Arc::new(FfmpegTrimmer::new(&config.ffmpeg_path)),
            analyzer: Arc::new(analyzer),
        })
    }
}

pub struct App {
    config: AppConfig,
    state: AppState,
    runner: Arc<AnalysisRunner>,
    janitor_stop: CancellationToken,
    pending: Arc<PendingTrims>,
}

impl App {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let storage: Arc<dyn StoragePort> = Arc::new(FsAdapter::new(&config.storage_root));
        let registry = Arc::new(JobRegistry::new());
        let pending = Arc::new(PendingTrims::new());
        let validator = Arc::new(UploadValidator::new(
            collaborators.probe,
            config.max_video_seconds,
            config.max_upload_bytes,
        ));
        let runner = Arc::new(AnalysisRunner::new(
            registry.clone(),
            collaborators.analyzer,
            storage.clone(),
            Arc::new(ChannelQueue::unbounded()),
            config.analysis_timeout,
            config.secrets(),
        ));
        let intake = Arc::new(IntakeService::new(
            storage.clone(),
            validator.clone(),
            registry.clone(),
            runner.clone(),
            pending.clone(),
        ));
        let trim = Arc::new(TrimCoordinator::new(
            storage.clone(),
            collaborators.trimmer,
            validator,
            registry.clone(),
            runner.clone(),
            pending.clone(),
        ));
        let cleanup = Arc::new(CleanupService::new(
            registry.clone(),
            pending.clone(),
            runner.clone(),
            storage.clone(),
        ));

        let state = AppState {
            registry,
            intake,
            trim,
            cleanup,
            poll_limiter: Arc::new(PollLimiter::per_second(config.status_poll_rate)),
            storage,
        };

        Self {
            config,
            state,
            runner,
            janitor_stop: CancellationToken::new(),
            pending,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.state.registry
    }

    pub fn router(&self) -> Router {
        http::router(self.state.clone(), self.config.max_upload_bytes)
    }

    /// Starts the analysis workers and the janitor.
    pub fn start_background(&self) -> Vec<JoinHandle<()>> {
        let mut handles = self.runner.spawn_workers(self.config.analysis_workers);

        let janitor = Janitor::new(
            self.state.registry.clone(),
            self.pending.clone(),
            self.state.cleanup.clone(),
            self.config.job_ttl,
            self.config.janitor_interval,
        );
        handles.push(tokio::spawn(janitor.run(self.janitor_stop.clone())));
        handles
    }

    /// Stops background work and removes every job's files.
    pub async fn shutdown(&self) {
        self.janitor_stop.cancel();
        self.runner.shutdown();
        let removed = self.state.cleanup.cleanup_all().await;
        info!("Removed {} jobs on shutdown", removed);
    }
}
