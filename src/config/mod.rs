//! # Configuration Management
//!
//! Typed configuration for the ReviewFlow engine with environment-aware YAML
//! loading and environment-variable overrides.
//!
//! Three sections mirror the engine's moving parts:
//! - [`PipelineConfig`] - batch sizing, aspect threshold, dispatch retries
//! - [`StorageConfig`] - job store backend and artifact areas
//! - [`WebConfig`] - status API bind address and middleware knobs

pub mod loader;

pub use loader::ConfigManager;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::{DEFAULT_ASPECT_SCORE_THRESHOLD, DEFAULT_BATCH_SIZE};

/// Configuration errors raised during loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid YAML in {path}: {message}")]
    InvalidYaml { path: String, message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Root configuration structure mirroring reviewflow-config.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewFlowConfig {
    /// Batch sizing and enrichment pipeline settings
    pub pipeline: PipelineConfig,

    /// Job store backend and artifact area settings
    pub storage: StorageConfig,

    /// Status API server settings
    pub web: WebConfig,
}

/// Batch sizing and dispatch behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records per dispatched batch
    pub batch_size: usize,

    /// Minimum score for an aspect label to be retained
    pub aspect_score_threshold: f64,

    /// Attempts per batch execution before dead-lettering (local substrate)
    pub dispatch_max_attempts: u32,

    /// Base backoff between local retry attempts, milliseconds
    pub dispatch_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            aspect_score_threshold: DEFAULT_ASPECT_SCORE_THRESHOLD,
            dispatch_max_attempts: 3,
            dispatch_backoff_ms: 250,
        }
    }
}

/// Which job store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

/// Job store backend and artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory` for local/test mode, `postgres` for durable deployments
    pub backend: StorageBackend,

    /// Connection string for the postgres backend
    pub database_url: Option<String>,

    /// Local filesystem root backing the artifact store
    pub data_root: PathBuf,

    /// Key prefix for intermediate per-batch artifacts
    pub silver_prefix: String,

    /// Key prefix for final report artifacts
    pub gold_prefix: String,

    /// Upload bucket name used when resolving correlation keys
    pub source_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: None,
            data_root: PathBuf::from("./data"),
            silver_prefix: "silver".to_string(),
            gold_prefix: "gold".to_string(),
            source_bucket: "reviewflow-bronze".to_string(),
        }
    }
}

/// Status API server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address the axum server binds, e.g. `0.0.0.0:3000`
    pub bind_address: String,

    /// Per-request timeout applied by the middleware stack, milliseconds
    pub request_timeout_ms: u64,

    /// Whether the permissive CORS layer is installed
    pub cors_enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_ms: 30_000,
            cors_enabled: true,
        }
    }
}

impl ReviewFlowConfig {
    /// Validate cross-field constraints after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::Invalid {
                message: "pipeline.batch_size must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.pipeline.aspect_score_threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "pipeline.aspect_score_threshold must be within [0.0, 1.0], got {}",
                    self.pipeline.aspect_score_threshold
                ),
            });
        }
        if self.pipeline.dispatch_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                message: "pipeline.dispatch_max_attempts must be at least 1".to_string(),
            });
        }
        if self.storage.backend == StorageBackend::Postgres && self.storage.database_url.is_none() {
            return Err(ConfigError::Invalid {
                message: "storage.database_url is required for the postgres backend".to_string(),
            });
        }
        if self.web.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "web.request_timeout_ms must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment-variable overrides on top of the loaded values.
    ///
    /// Recognized variables: `REVIEWFLOW_BATCH_SIZE`, `ASPECT_SCORE_THRESHOLD`,
    /// `REVIEWFLOW_STORAGE_BACKEND`, `DATABASE_URL`, `REVIEWFLOW_DATA_ROOT`,
    /// `REVIEWFLOW_SOURCE_BUCKET`, `REVIEWFLOW_BIND_ADDRESS`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("REVIEWFLOW_BATCH_SIZE") {
            match raw.parse::<usize>() {
                Ok(value) => self.pipeline.batch_size = value,
                Err(_) => tracing::warn!(value = %raw, "Ignoring unparseable REVIEWFLOW_BATCH_SIZE"),
            }
        }
        if let Ok(raw) = std::env::var("ASPECT_SCORE_THRESHOLD") {
            match raw.parse::<f64>() {
                Ok(value) => self.pipeline.aspect_score_threshold = value,
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring unparseable ASPECT_SCORE_THRESHOLD");
                }
            }
        }
        if let Ok(raw) = std::env::var("REVIEWFLOW_STORAGE_BACKEND") {
            match raw.as_str() {
                "memory" => self.storage.backend = StorageBackend::Memory,
                "postgres" => self.storage.backend = StorageBackend::Postgres,
                other => tracing::warn!(value = %other, "Ignoring unknown REVIEWFLOW_STORAGE_BACKEND"),
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.storage.database_url = Some(url);
        }
        if let Ok(root) = std::env::var("REVIEWFLOW_DATA_ROOT") {
            self.storage.data_root = PathBuf::from(root);
        }
        if let Ok(bucket) = std::env::var("REVIEWFLOW_SOURCE_BUCKET") {
            self.storage.source_bucket = bucket;
        }
        if let Ok(addr) = std::env::var("REVIEWFLOW_BIND_ADDRESS") {
            self.web.bind_address = addr;
        }
    }
}
