use crate::ports::trimmer::{TrimFailure, Trimmer};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Trimmer backed by the `ffmpeg` executable.
pub struct FfmpegTrimmer {
    binary: PathBuf,
}

impl FfmpegTrimmer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Trimmer for FfmpegTrimmer {
    async fn trim(&self, input: &Path, output: &Path, max_seconds: f64) -> Result<(), TrimFailure> {
        let result = Command::new(&self.binary)
            .arg("-y")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-t")
            .arg(format!("{:.3}", max_seconds))
            .arg("-c:v")
            .arg("libx264")
            .arg("-c:a")
            .arg("aac")
            .arg("-movflags")
            .arg("+faststart")
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            debug!(
                "ffmpeg exited with {:?}: {}",
                result.status.code(),
                String::from_utf8_lossy(&result.stderr).trim()
            );
            return Err(TrimFailure::Failed(result.status.code()));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(TrimFailure::NoOutput),
        }
    }
}
