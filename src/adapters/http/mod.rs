//! HTTP inbound adapter.
//!
//! Routes:
//! - `POST /upload`: multipart upload, field `video`
//! - `POST /trim-and-analyze`: opt into trimming a pending over-long upload
//! - `GET /status/:job_id`: poll a job
//! - `POST /cleanup/:job_id`: forget a job and delete its files
//! - `GET /evidence/*path`: evidence image referenced by a report
//! - `GET /health`

mod cleanup;
mod error;
mod evidence;
mod health;
mod poll_limit;
mod status;
mod trim;
mod upload;

pub use poll_limit::PollLimiter;

use crate::application::cleanup::CleanupService;
use crate::application::intake::IntakeService;
use crate::application::registry::JobRegistry;
use crate::application::trim::TrimCoordinator;
use crate::ports::storage::StoragePort;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Room for multipart framing around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub intake: Arc<IntakeService>,
    pub trim: Arc<TrimCoordinator>,
    pub cleanup: Arc<CleanupService>,
    pub poll_limiter: Arc<PollLimiter>,
    pub storage: Arc<dyn StoragePort>,
}

pub fn router(state: AppState, max_upload_bytes: u64) -> Router {
    // Oversized files are refused by intake with a proper message; this
    // only stops bodies that are far beyond any acceptable upload.
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/upload", post(upload::upload_video))
        .route("/trim-and-analyze", post(trim::trim_and_analyze))
        .route("/status/:job_id", get(status::job_status))
        .route("/cleanup/:job_id", post(cleanup::cleanup_job))
        .route("/evidence/*path", get(evidence::evidence_image))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
