//! Health check endpoint for monitoring and load balancer probes.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::web::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Basic health check endpoint: GET /health
///
/// Returns OK whenever the service is up; no dependencies are probed.
pub async fn health_check(_state: State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
