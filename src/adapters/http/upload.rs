use super::AppState;
use crate::domain::jobs::JobId;
use crate::domain::upload::{RejectReason, UploadOutcome};
use crate::error::{Error, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::debug;

const VIDEO_FIELD: &str = "video";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Started {
        job_id: JobId,
        message: String,
        duration: f64,
    },
    NeedsTrimming {
        needs_trimming: bool,
        job_id: JobId,
        temp_video_path: String,
        original_duration: f64,
        max_duration: f64,
        message: String,
    },
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Started { job_id, duration } => UploadResponse::Started {
                job_id,
                message: "Video uploaded successfully. Processing started.".to_string(),
                duration,
            },
            UploadOutcome::NeedsTrim {
                job_id,
                temp_video_path,
                original_duration,
                max_duration,
            } => UploadResponse::NeedsTrimming {
                needs_trimming: true,
                job_id,
                temp_video_path,
                original_duration,
                max_duration,
                message: format!(
                    "Video is {:.1} seconds long. Would you like to analyze the first {:.0} seconds?",
                    original_duration, max_duration
                ),
            },
        }
    }
}

// Streams the `video` field straight into the job's storage area.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Rejected upload body: {}", e);
        Error::Validation(RejectReason::MissingFile)
    })?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(RejectReason::MissingFile.into()),
            Err(e) => {
                debug!("Malformed multipart body: {}", e);
                return Err(Error::bad_request("Malformed upload"));
            }
        };
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_owned(),
            _ => return Err(RejectReason::MissingFile.into()),
        };
        let outcome = state.intake.admit(&file_name, field).await?;
        return Ok(Json(outcome.into()));
    }
}
