//! # Dataset Intake
//!
//! Everything between "a CSV landed" and "N batch executions are in flight":
//!
//! - [`sanitize`] - text normalization shared by the splitter and the stages
//! - [`mapping`] - the uploader's column-mapping contract and its validation
//! - [`dataset`] - CSV parsing, record cleaning, fixed-size partitioning
//! - [`splitter`] - the intake orchestration itself: content-hash identity,
//!   idempotent registration, fan-out, and the late-failure upsert
//!
//! Intake is idempotent end to end: the job id is a content hash, so the
//! same uploaded bytes always resolve to the same job, and registration is
//! create-if-absent.

pub mod dataset;
pub mod mapping;
pub mod sanitize;
pub mod splitter;

pub use mapping::{ColumnMapping, MAPPING_METADATA_KEY};
pub use sanitize::sanitize_text;
pub use splitter::{DatasetUpload, IntakeOutcome, Splitter};

use thiserror::Error;

use crate::pipeline::DispatchError;
use crate::store::StoreError;

/// Errors raised while turning an upload into dispatched batches.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The upload or its metadata violate the intake contract; nothing was
    /// dispatched.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Dataset parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
