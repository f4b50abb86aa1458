//! # PostgreSQL Job Store
//!
//! Durable [`JobStore`] backend. Every contract-level atomicity requirement
//! maps to a single guarded SQL statement:
//!
//! - registration: `INSERT ... ON CONFLICT (job_id) DO NOTHING`
//! - counter: `SET processed_batches = LEAST(processed_batches + 1, total_batches)`
//! - transitions: `UPDATE ... WHERE status = ANY(<valid sources>)`
//!
//! Queries use the runtime API (`sqlx::query` with binds) rather than the
//! compile-time macros, so the crate builds without a reachable database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::{debug, warn};

use super::{JobStore, RegistrationOutcome, StoreError};
use crate::models::{Job, JobStatus, NewJob};

const SELECT_COLUMNS: &str = "job_id, status, total_batches, processed_batches, \
source_correlation_key, error_message, created_at, updated_at";

pub struct PgJobStore {
    pool: PgPool,
}

/// Raw row shape; status and counters are validated on the way out.
#[derive(Debug, FromRow)]
struct JobRow {
    job_id: String,
    status: String,
    total_batches: i32,
    processed_batches: i32,
    source_correlation_key: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_str(&row.status).map_err(|message| StoreError::CorruptRow {
            job_id: row.job_id.clone(),
            message,
        })?;
        let total_batches = u32::try_from(row.total_batches).map_err(|_| StoreError::CorruptRow {
            job_id: row.job_id.clone(),
            message: format!("negative total_batches: {}", row.total_batches),
        })?;
        let processed_batches =
            u32::try_from(row.processed_batches).map_err(|_| StoreError::CorruptRow {
                job_id: row.job_id.clone(),
                message: format!("negative processed_batches: {}", row.processed_batches),
            })?;
        Ok(Job {
            job_id: row.job_id,
            status,
            total_batches,
            processed_batches,
            source_correlation_key: row.source_correlation_key,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and ensure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the jobs table and the correlation-key index if absent.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reviewflow_jobs (
                job_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                total_batches INTEGER NOT NULL DEFAULT 0,
                processed_batches INTEGER NOT NULL DEFAULT 0,
                source_correlation_key TEXT NOT NULL,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS reviewflow_jobs_correlation_idx \
             ON reviewflow_jobs (source_correlation_key)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Job store schema ensured");
        Ok(())
    }

    async fn fetch(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM reviewflow_jobs WHERE job_id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    /// Guarded transition shared by `update_status` and `mark_failed`.
    async fn transition(
        &self,
        job_id: &str,
        to: JobStatus,
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        if !to.is_storable() {
            return Err(StoreError::UnstorableStatus { status: to });
        }
        let sources: Vec<String> = JobStatus::valid_sources(to)
            .into_iter()
            .map(|status| status.to_string())
            .collect();

        let rows_affected = match message {
            Some(message) => {
                sqlx::query(
                    "UPDATE reviewflow_jobs
                     SET status = $2, error_message = $4, updated_at = NOW()
                     WHERE job_id = $1 AND status = ANY($3)",
                )
                .bind(job_id)
                .bind(to.to_string())
                .bind(&sources)
                .bind(message)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
            None => {
                sqlx::query(
                    "UPDATE reviewflow_jobs
                     SET status = $2, updated_at = NOW()
                     WHERE job_id = $1 AND status = ANY($3)",
                )
                .bind(job_id)
                .bind(to.to_string())
                .bind(&sources)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
        };

        if rows_affected == 1 {
            return Ok(());
        }

        // Distinguish a missing row from a guard rejection
        match self.fetch(job_id).await? {
            None => Err(StoreError::JobNotFound {
                job_id: job_id.to_string(),
            }),
            Some(job) => Err(StoreError::IllegalTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to,
            }),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn register(&self, new_job: NewJob) -> Result<RegistrationOutcome, StoreError> {
        let total = i32::try_from(new_job.total_batches).map_err(|_| StoreError::CorruptRow {
            job_id: new_job.job_id.clone(),
            message: format!("total_batches out of range: {}", new_job.total_batches),
        })?;

        let result = sqlx::query(
            "INSERT INTO reviewflow_jobs \
             (job_id, status, total_batches, processed_batches, source_correlation_key) \
             VALUES ($1, $2, $3, 0, $4) \
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(&new_job.job_id)
        .bind(JobStatus::InProgress.to_string())
        .bind(total)
        .bind(&new_job.source_correlation_key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(RegistrationOutcome::Created)
        } else {
            Ok(RegistrationOutcome::AlreadyExists)
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        self.fetch(job_id).await
    }

    async fn find_by_correlation_key(&self, key: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM reviewflow_jobs \
             WHERE source_correlation_key = $1 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn increment_processed(&self, job_id: &str) -> Result<u32, StoreError> {
        let new_count: Option<i32> = sqlx::query_scalar(
            "UPDATE reviewflow_jobs \
             SET processed_batches = LEAST(processed_batches + 1, total_batches), \
                 updated_at = NOW() \
             WHERE job_id = $1 \
             RETURNING processed_batches",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match new_count {
            Some(count) => u32::try_from(count).map_err(|_| StoreError::CorruptRow {
                job_id: job_id.to_string(),
                message: format!("negative processed_batches: {count}"),
            }),
            None => Err(StoreError::JobNotFound {
                job_id: job_id.to_string(),
            }),
        }
    }

    async fn update_status(&self, job_id: &str, to: JobStatus) -> Result<(), StoreError> {
        self.transition(job_id, to, None).await
    }

    async fn mark_failed(
        &self,
        job_id: &str,
        to: JobStatus,
        message: &str,
    ) -> Result<(), StoreError> {
        self.transition(job_id, to, Some(message)).await
    }

    async fn record_intake_failure(
        &self,
        job_id: &str,
        correlation_key: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        // Upsert, but never clobber a row that already left IN_PROGRESS
        let result = sqlx::query(
            "INSERT INTO reviewflow_jobs \
             (job_id, status, total_batches, processed_batches, source_correlation_key, error_message) \
             VALUES ($1, $2, 0, 0, $3, $4) \
             ON CONFLICT (job_id) DO UPDATE \
             SET status = EXCLUDED.status, error_message = EXCLUDED.error_message, updated_at = NOW() \
             WHERE reviewflow_jobs.status = $5",
        )
        .bind(job_id)
        .bind(JobStatus::SplitterFailed.to_string())
        .bind(correlation_key)
        .bind(message)
        .bind(JobStatus::InProgress.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(
                job_id = %job_id,
                "Intake failure reported for a job no longer in progress, leaving stored status"
            );
        }
        Ok(())
    }
}
