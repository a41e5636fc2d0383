use super::AppState;
use crate::domain::jobs::JobId;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: &'static str,
}

// Always succeeds: unknown or malformed ids are a no-op.
pub async fn cleanup_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<CleanupResponse> {
    if let Ok(id) = job_id.parse::<JobId>() {
        state.cleanup.cleanup(&id).await;
    }
    Json(CleanupResponse {
        message: "Job cleaned up successfully",
    })
}
