//! Shared state for the status API.

use std::sync::Arc;

use crate::aggregate::Stitcher;
use crate::config::WebConfig;
use crate::store::JobStore;

/// Everything the handlers need, cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub stitcher: Arc<Stitcher>,
    /// Upload bucket name used to rebuild correlation keys for `find-job`
    pub source_bucket: String,
    pub config: WebConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        stitcher: Arc<Stitcher>,
        source_bucket: impl Into<String>,
        config: WebConfig,
    ) -> Self {
        Self {
            store,
            stitcher,
            source_bucket: source_bucket.into(),
            config,
        }
    }
}
