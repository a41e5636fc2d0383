use super::AppState;
use crate::domain::jobs::{JobId, EVIDENCE_DIR};
use crate::error::{Error, Result};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::io;

// Serves `<job_id>/evidence/<file>` as published in a report's `web_image_path`.
// Only files inside the evidence directory of a job that is still registered
// are reachable.
pub async fn evidence_image(
    State(state): State<AppState>,
    Path(relative): Path<String>,
) -> Result<Response> {
    let (job, _) = relative.split_once('/').ok_or(Error::NotFound)?;
    let id: JobId = job.parse().map_err(|_| Error::NotFound)?;
    state.registry.get(&id)?;

    let path = state.storage.resolve(&relative).ok_or(Error::NotFound)?;
    let evidence_dir = state.storage.area(&id).join(EVIDENCE_DIR);
    if !path.starts_with(&evidence_dir) || path == evidence_dir {
        return Err(Error::NotFound);
    }

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(Error::NotFound),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NotFound),
        Err(e) => return Err(e.into()),
    }
    let data = tokio::fs::read(&path).await?;

    // Basic mime detection
    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
