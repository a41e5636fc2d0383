//! Analyzer that runs an external command per job.
//!
//! The command receives the video path and the evidence directory as its last
//! two arguments and reports back on stdout, one JSON object per line:
//!
//! ```text
//! {"progress": 35, "step": "Grouping frames"}
//! {"report": {"summary": {...}, "analysis_metadata": {...}, "incidents": [...]}}
//! {"error": "Vision API rejected the request"}
//! ```

use crate::config::AnalyzerConfig;
use crate::domain::report::Report;
use crate::ports::analyzer::{AnalysisFailure, AnalysisRequest, Analyzer, ProgressSink};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Environment variable the analyzer reads its credential from.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnalyzerMessage {
    Progress {
        progress: i64,
        #[serde(default)]
        step: String,
    },
    Report {
        report: Box<Report>,
    },
    Error {
        error: String,
    },
}

pub struct CommandAnalyzer {
    command: PathBuf,
    args: Vec<String>,
    api_key: Option<String>,
}

impl CommandAnalyzer {
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>, api_key: Option<String>) -> Self {
        Self {
            command: command.into(),
            args,
            api_key,
        }
    }

    /// Returns `None` when no command is configured.
    pub fn from_config(config: &AnalyzerConfig) -> Option<Self> {
        let command = config.command.clone()?;
        Some(Self::new(command, config.args.clone(), config.api_key.clone()))
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        progress: &dyn ProgressSink,
    ) -> Result<Report, AnalysisFailure> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(&request.video_path)
            .arg(&request.evidence_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(key) = &self.api_key {
            command.env(API_KEY_ENV, key);
        }

        let mut child = command.spawn().map_err(AnalysisFailure::Launch)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisFailure::Collaborator("analyzer stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(request.job_id.to_string(), stderr));
        }

        let mut report = None;
        let mut failure = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.map_err(AnalysisFailure::Io)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AnalyzerMessage>(line) {
                Ok(AnalyzerMessage::Progress { progress: pct, step }) => progress.report(pct, &step),
                Ok(AnalyzerMessage::Report { report: r }) => report = Some(*r),
                Ok(AnalyzerMessage::Error { error }) => failure = Some(error),
                Err(_) => debug!("Analyzer for job {}: {}", request.job_id, line),
            }
        }

        let status = child.wait().await.map_err(AnalysisFailure::Io)?;
        if let Some(message) = failure {
            return Err(AnalysisFailure::Collaborator(message));
        }
        if !status.success() {
            return Err(AnalysisFailure::Collaborator(format!(
                "analyzer exited with status {}",
                status.code().map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )));
        }
        report.ok_or(AnalysisFailure::NoReport)
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    async fn analyze(
        &self,
        request: AnalysisRequest,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<Report, AnalysisFailure> {
        // Dropping the run future kills the child.
        tokio::select! {
            _ = cancel.cancelled() => Err(AnalysisFailure::Cancelled),
            result = self.run(&request, progress.as_ref()) => result,
        }
    }
}

async fn drain_stderr<R: AsyncRead + Unpin>(job_id: String, stderr: R) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("Analyzer stderr for job {}: {}", job_id, line);
    }
}
