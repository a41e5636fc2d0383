use crate::domain::jobs::VIDEO_FILE;
use crate::domain::upload::{RejectReason, ValidationOutcome};
use crate::ports::probe::MediaProbe;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Slack allowed on trimmed output only. Encoders cut on frame boundaries and
/// may overshoot the requested duration slightly.
pub const TRIM_TOLERANCE_SECS: f64 = 0.5;

/// Decides whether an uploaded file is admitted, needs trimming or is refused.
pub struct UploadValidator {
    probe: Arc<dyn MediaProbe>,
    max_duration: f64,
    max_upload_bytes: u64,
}

impl UploadValidator {
    pub fn new(probe: Arc<dyn MediaProbe>, max_duration: f64, max_upload_bytes: u64) -> Self {
        Self {
            probe,
            max_duration,
            max_upload_bytes,
        }
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Cheap check on the client-supplied name, done before any bytes are stored.
    pub fn check_file_name(file_name: &str) -> Result<(), RejectReason> {
        if file_name.trim().is_empty() {
            return Err(RejectReason::MissingFile);
        }
        let is_mp4 = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
        if is_mp4 {
            Ok(())
        } else {
            Err(RejectReason::WrongFormat)
        }
    }

    /// Classifies a fresh upload. Anything longer than the limit needs trimming.
    pub async fn validate(&self, path: &Path, file_name: &str) -> ValidationOutcome {
        self.classify(path, file_name, 0.0).await
    }

    /// Re-checks a video produced by the trimmer.
    pub async fn validate_trimmed(&self, path: &Path) -> ValidationOutcome {
        self.classify(path, VIDEO_FILE, TRIM_TOLERANCE_SECS).await
    }

    async fn classify(&self, path: &Path, file_name: &str, tolerance: f64) -> ValidationOutcome {
        if let Err(reason) = Self::check_file_name(file_name) {
            return ValidationOutcome::Rejected(reason);
        }

        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("Stored upload is not readable: {}", e);
                return ValidationOutcome::Rejected(RejectReason::Unreadable);
            }
        };
        if size == 0 {
            return ValidationOutcome::Rejected(RejectReason::Unreadable);
        }
        if size > self.max_upload_bytes {
            return ValidationOutcome::Rejected(RejectReason::too_large(self.max_upload_bytes));
        }

        let av = match self.probe.probe(path).await {
            Ok(av) => av,
            Err(e) => {
                debug!("Probe refused upload: {}", e);
                return ValidationOutcome::Rejected(RejectReason::Unreadable);
            }
        };
        if !av.is_mp4() || !av.has_video() {
            return ValidationOutcome::Rejected(RejectReason::WrongFormat);
        }
        let Some(duration) = av.known_duration() else {
            return ValidationOutcome::Rejected(RejectReason::DurationIndeterminate);
        };
        for stream in &av.video_streams {
            debug!("Probed {:.1}s video stream: {}", duration, stream);
        }

        if duration > self.max_duration + tolerance {
            ValidationOutcome::NeedsTrim {
                path: path.to_path_buf(),
                duration,
            }
        } else {
            ValidationOutcome::Accepted {
                path: path.to_path_buf(),
                duration,
            }
        }
    }
}
