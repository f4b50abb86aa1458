//! # Job Store
//!
//! Single source of truth for job lifecycle state: registration, the
//! progress counter, status transitions, and correlation lookup.
//!
//! ## Overview
//!
//! All cross-batch coordination flows through this trait. The contract
//! carries the atomicity requirements so callers never need read-modify-write
//! cycles of their own:
//!
//! - `register` is create-if-absent and reports which of the two happened
//!   as a [`RegistrationOutcome`], not as an error
//! - `increment_processed` is a linearizable counter bump that saturates at
//!   `total_batches`, so replayed deliveries from the at-least-once dispatch
//!   substrate cannot push the counter past the total
//! - `update_status` enforces the state machine's transition guard, which is
//!   also what makes the stitcher single-flight per job
//!
//! Two backends ship: [`MemoryJobStore`] for tests and local mode, and
//! [`PgJobStore`] for durable deployments.

pub mod memory;
pub mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Job, JobStatus, NewJob};

/// Errors raised by job store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Illegal status transition for job {job_id}: {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Status {status} is a read-time projection and cannot be stored")]
    UnstorableStatus { status: JobStatus },

    #[error("Corrupt job row for {job_id}: {message}")]
    CorruptRow { job_id: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// What `register` did for the supplied job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new job row was created; the caller owns the fan-out.
    Created,
    /// The job id already exists; the caller must not fan out again.
    AlreadyExists,
}

/// Lifecycle storage for enrichment jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Atomically create the job if no row with this id exists.
    async fn register(&self, new_job: NewJob) -> Result<RegistrationOutcome, StoreError>;

    /// Fetch a job by id.
    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    /// Reverse lookup by the correlation key recorded at intake. When several
    /// jobs share a key the most recently created wins.
    async fn find_by_correlation_key(&self, key: &str) -> Result<Option<Job>, StoreError>;

    /// Atomically bump the processed-batch counter, saturating at
    /// `total_batches`, and return the new value.
    async fn increment_processed(&self, job_id: &str) -> Result<u32, StoreError>;

    /// Transition the stored status, enforcing the state machine guard.
    async fn update_status(&self, job_id: &str, to: JobStatus) -> Result<(), StoreError>;

    /// Transition into a failure status and record the diagnostic message.
    async fn mark_failed(
        &self,
        job_id: &str,
        to: JobStatus,
        message: &str,
    ) -> Result<(), StoreError>;

    /// Record a late intake failure. Upserts: when no row exists yet a
    /// `SPLITTER_FAILED` row is created so the failure stays diagnosable;
    /// an existing `IN_PROGRESS` row is transitioned; any other stored
    /// status is left untouched.
    async fn record_intake_failure(
        &self,
        job_id: &str,
        correlation_key: &str,
        message: &str,
    ) -> Result<(), StoreError>;
}
