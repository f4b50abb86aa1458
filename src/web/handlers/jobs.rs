//! # Job Status Handlers
//!
//! Read-only endpoints over the job store: direct status lookup by job id
//! and reverse lookup from an upload id via the correlation key recorded at
//! intake. Both report the effective status, so `PROCESSING_COMPLETE` shows
//! up here without ever being stored.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{JobProgressView, JobStatus};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Get job progress: GET /v1/jobs/{job_id}
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobProgressView>> {
    debug!(job_id = %job_id, "Job status requested");

    let job = state
        .store
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Job not found: {job_id}")))?;

    Ok(Json(JobProgressView::from(&job)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindJobResponse {
    pub upload_id: String,
    pub job_id: String,
    pub status: JobStatus,
}

/// Resolve an upload id to its job: GET /v1/find-job/{upload_id}
///
/// Rebuilds the correlation key the splitter recorded for uploads landing
/// under `{bucket}/uploads/{upload_id}/`. A 404 here is often transient:
/// the upload may still be splitting, so callers should retry before giving
/// up.
pub async fn find_job(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> ApiResult<Json<FindJobResponse>> {
    let correlation_key = format!("{}/uploads/{}/", state.source_bucket, upload_id);
    debug!(
        upload_id = %upload_id,
        correlation_key = %correlation_key,
        "Correlation lookup requested"
    );

    let job = state
        .store
        .find_by_correlation_key(&correlation_key)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "No job found for upload {upload_id} yet; the upload may still be splitting"
            ))
        })?;

    Ok(Json(FindJobResponse {
        upload_id,
        job_id: job.job_id.clone(),
        status: job.effective_status(),
    }))
}
