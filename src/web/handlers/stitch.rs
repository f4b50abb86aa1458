//! # Finalize Handler
//!
//! Turns a POST into one stitch attempt. The work runs on a spawned task
//! and the handler awaits its handle, so a client that disconnects (or a
//! middleware timeout that fires) cannot abort a stitch already underway;
//! the job still converges to a terminal status and the client repolls.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::aggregate::StitchOutcome;
use crate::models::JobStatus;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct StitchResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<usize>,
}

/// Trigger fan-in for a job: POST /v1/jobs/{job_id}/stitch
///
/// Replies 404 for an unknown job, 409 when the claim is lost (stitch
/// already ran or is running), and otherwise reports the terminal status
/// the job reached.
pub async fn finalize_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StitchResponse>> {
    info!(job_id = %job_id, "Finalize requested");

    let stitcher = Arc::clone(&state.stitcher);
    let stitch_job_id = job_id.clone();
    let handle = tokio::spawn(async move { stitcher.stitch(&stitch_job_id).await });

    let outcome = handle
        .await
        .map_err(|join_error| {
            error!(job_id = %job_id, error = %join_error, "Stitch task panicked");
            ApiError::Internal
        })??;

    let response = match outcome {
        StitchOutcome::Completed { records, topics } => StitchResponse {
            job_id,
            status: JobStatus::Completed,
            records: Some(records),
            topics: Some(topics),
        },
        StitchOutcome::NoBatches => StitchResponse {
            job_id,
            status: JobStatus::FailedNoBatchesCompleted,
            records: None,
            topics: None,
        },
    };
    Ok(Json(response))
}
