use super::jobs::JobId;
use std::path::PathBuf;

/// Why an upload was refused. The display text is what clients see.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectReason {
    #[error("No video file provided")]
    MissingFile,
    #[error("Only MP4 video files are allowed")]
    WrongFormat,
    #[error("Invalid or corrupt video file")]
    Unreadable,
    #[error("Could not determine the video duration")]
    DurationIndeterminate,
    #[error("File size must be less than {limit_mb} MB")]
    TooLarge { limit_mb: u64 },
}

impl RejectReason {
    pub fn too_large(limit_bytes: u64) -> Self {
        RejectReason::TooLarge {
            limit_mb: limit_bytes.div_ceil(1024 * 1024),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted { path: PathBuf, duration: f64 },
    NeedsTrim { path: PathBuf, duration: f64 },
    Rejected(RejectReason),
}

/// Result of admitting an upload, before it is rendered for HTTP.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Started {
        job_id: JobId,
        duration: f64,
    },
    NeedsTrim {
        job_id: JobId,
        /// Storage-relative path the client echoes back to opt into trimming.
        temp_video_path: String,
        original_duration: f64,
        max_duration: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_rounds_limit_up_to_whole_megabytes() {
        assert_eq!(
            RejectReason::too_large(3 * 1024 * 1024).to_string(),
            "File size must be less than 3 MB"
        );
        assert_eq!(
            RejectReason::too_large(3 * 1024 * 1024 + 1).to_string(),
            "File size must be less than 4 MB"
        );
    }
}
