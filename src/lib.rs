#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # ReviewFlow Core
//!
//! Job orchestration and aggregation engine for batched review-enrichment
//! pipelines.
//!
//! ## Overview
//!
//! ReviewFlow Core coordinates the lifecycle of a review-dataset enrichment
//! job: a CSV upload is hashed into a content-addressed job id, cleaned and
//! split into fixed-size record batches, fanned out to a three-stage
//! enrichment pipeline (sentiment, topical classification, aspect
//! extraction), tracked through a linearizable progress counter, and finally
//! stitched back together into corpus-level report artifacts with discovered
//! topics.
//!
//! The ML models behind each stage are black boxes behind traits. The value
//! of this crate is the orchestration around them: idempotent intake,
//! progress accounting, the job status state machine, the failure taxonomy,
//! and the artifact lifecycle.
//!
//! ## Key Features
//!
//! - **Idempotent Intake**: content-hash job identity with create-if-absent
//!   registration; duplicate uploads never spawn duplicate work
//! - **Batch Fan-Out**: fixed-size partitioning with a dispatcher seam to an
//!   at-least-once execution substrate
//! - **Sequential Enrichment**: three inference stages in fixed order, each
//!   adding one derived column, with per-record fault isolation
//! - **Linearizable Progress**: atomic saturating counters with a derived
//!   `PROCESSING_COMPLETE` projection
//! - **Fan-In Stitching**: deterministic merge, corpus-level topic
//!   discovery, final artifacts, intermediate cleanup, terminal states
//! - **Read-Only Status API**: axum endpoints for progress polling and
//!   correlation-key resolution
//!
//! ## Module Organization
//!
//! - [`models`] - Job records, the status state machine, record batches
//! - [`store`] - Job store trait with in-memory and PostgreSQL backends
//! - [`artifacts`] - Intermediate and final artifact areas over `object_store`
//! - [`ingest`] - Sanitization, column mapping, dataset splitting, intake
//! - [`pipeline`] - Enrichment stages, the batch runner, the dispatch seam
//! - [`inference`] - Black-box model traits and deterministic built-ins
//! - [`aggregate`] - The stitcher (fan-in aggregation)
//! - [`web`] - Status and correlation HTTP API
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reviewflow_core::config::ReviewFlowConfig;
//! use reviewflow_core::ingest::DatasetUpload;
//! use reviewflow_core::system::ReviewFlowSystem;
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReviewFlowConfig::default();
//! let system = ReviewFlowSystem::bootstrap(config).await?;
//!
//! let mut metadata = HashMap::new();
//! metadata.insert(
//!     "mapping".to_string(),
//!     r#"{"full_review_text": "review_body"}"#.to_string(),
//! );
//! let upload = DatasetUpload::new(
//!     "bronze",
//!     "uploads/demo/reviews.csv",
//!     metadata,
//!     b"review_body\ngreat quality\n".to_vec(),
//! );
//!
//! let outcome = system.splitter().ingest(upload).await?;
//! println!("intake outcome: {outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod artifacts;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod system;
pub mod web;

pub use aggregate::{StitchError, StitchOutcome, Stitcher};
pub use config::ReviewFlowConfig;
pub use error::{Result, ReviewFlowError};
pub use ingest::{DatasetUpload, IntakeError, IntakeOutcome, Splitter};
pub use models::{Job, JobProgressView, JobStatus, NewJob, RecordBatch, ReviewRecord};
pub use pipeline::{BatchDispatcher, BatchPipelineRunner, LocalDispatcher};
pub use store::{JobStore, MemoryJobStore, RegistrationOutcome, StoreError};
pub use system::ReviewFlowSystem;
