use super::AppState;
use crate::domain::jobs::JobId;
use crate::error::{Error, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TrimRequest {
    pub job_id: String,
    pub temp_video_path: String,
}

#[derive(Debug, Serialize)]
pub struct TrimResponse {
    pub job_id: JobId,
    pub message: String,
    pub trimmed_duration: f64,
}

pub async fn trim_and_analyze(
    State(state): State<AppState>,
    request: std::result::Result<Json<TrimRequest>, JsonRejection>,
) -> Result<Json<TrimResponse>> {
    let Json(request) = request.map_err(|e| {
        debug!("Rejected trim request: {}", e);
        Error::bad_request("Missing required data")
    })?;
    let original: JobId = request
        .job_id
        .parse()
        .map_err(|_| Error::bad_request("No pending upload for this job"))?;

    let trimmed = state
        .trim
        .trim_and_reissue(&original, &request.temp_video_path)
        .await?;

    Ok(Json(TrimResponse {
        job_id: trimmed.job_id,
        message: format!(
            "Video trimmed to {:.1} seconds. Analysis started.",
            trimmed.duration
        ),
        trimmed_duration: trimmed.duration,
    }))
}
