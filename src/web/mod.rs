//! # Web API Module
//!
//! Axum-based status and correlation API. Strictly read-only against the
//! job store except for the finalize endpoint, which triggers the fan-in.
//!
//! ## Endpoints
//!
//! - `GET /health` - liveness probe
//! - `GET /v1/jobs/{job_id}` - progress and effective status
//! - `GET /v1/find-job/{upload_id}` - correlation lookup from an upload id
//! - `POST /v1/jobs/{job_id}/stitch` - trigger fan-in for a job
//!
//! ## Core Components
//!
//! - [`routes`] - HTTP route definitions
//! - [`handlers`] - request handlers per endpoint family
//! - [`state`] - shared application state
//! - [`errors`] - API error types and HTTP conversions

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use errors::{ApiError, ApiResult};
pub use state::AppState;

use axum::Router;
use tracing::{error, info};

/// Create the axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let request_timeout = std::time::Duration::from_millis(state.config.request_timeout_ms);
    let cors_enabled = state.config.cors_enabled;

    let mut app = Router::new()
        .merge(routes::health_routes())
        .nest("/v1", routes::api_v1_routes())
        .layer(tower_http::timeout::TimeoutLayer::new(request_timeout))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    if cors_enabled {
        app = app.layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    app.with_state(state)
}

/// Bind the configured address and serve until a shutdown signal arrives.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let bind_address = state.config.bind_address.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Status API listening on {}", bind_address);
    info!("   Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining status API"),
        Err(err) => error!(error = %err, "Failed to listen for shutdown signal"),
    }
}
