//! Route definitions for the status API, grouped by endpoint family.

use axum::routing::{get, post};
use axum::Router;

use crate::web::{handlers, state::AppState};

/// Health check routes for monitoring probes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Versioned API routes, nested under `/v1` by the app assembly.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/:job_id", get(handlers::jobs::job_status))
        .route("/jobs/:job_id/stitch", post(handlers::stitch::finalize_job))
        .route("/find-job/:upload_id", get(handlers::jobs::find_job))
}
