use super::AppState;
use crate::domain::jobs::{JobId, JobSnapshot, JobStatus};
use crate::domain::report::Report;
use crate::error::{Error, Result};
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Arc<Report>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobSnapshot> for StatusResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job_id: snapshot.id,
            status: snapshot.status,
            progress: snapshot.progress,
            current_step: snapshot.current_step,
            created_at: snapshot.created_at,
            finished_at: snapshot.finished_at,
            result: snapshot.result,
            error: snapshot.error,
        }
    }
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let id: JobId = job_id.parse().map_err(|_| Error::NotFound)?;
    let snapshot = state.registry.get(&id)?;
    state.poll_limiter.check(&id)?;
    Ok(Json(snapshot.into()))
}
