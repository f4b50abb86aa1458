//! # Structured Error Handling
//!
//! Crate-level error facade. Each component defines its own `thiserror` enum
//! next to the code that produces it (`IntakeError`, `StoreError`,
//! `PipelineError`, ...); this module aggregates them for callers that drive
//! the engine end to end, such as the system bootstrap and the server binary.

use thiserror::Error;

use crate::aggregate::StitchError;
use crate::artifacts::ArtifactError;
use crate::config::ConfigError;
use crate::ingest::IntakeError;
use crate::pipeline::{DispatchError, PipelineError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ReviewFlowError {
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Stitch error: {0}")]
    Stitch(#[from] StitchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ReviewFlowError>;
