//! # Data Models
//!
//! Core domain types shared across the engine: the job record and its status
//! state machine, the review record with its derived enrichment columns, and
//! the batch envelope handed to the dispatch substrate.

pub mod batch;
pub mod job;
pub mod record;

pub use batch::{BatchExecution, EnrichmentConfig, RecordBatch};
pub use job::{Job, JobProgressView, JobStatus, NewJob};
pub use record::ReviewRecord;
