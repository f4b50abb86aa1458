//! # In-Memory Job Store
//!
//! DashMap-backed [`JobStore`] for tests and single-process local mode.
//! Mutations go through the map's per-shard entry locks, which is what makes
//! `increment_processed` linearizable without an outer mutex.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;

use super::{JobStore, RegistrationOutcome, StoreError};
use crate::models::{Job, JobStatus, NewJob};

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: DashMap<String, Job>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs currently stored.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn guarded_transition(
        job: &mut Job,
        to: JobStatus,
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        if !to.is_storable() {
            return Err(StoreError::UnstorableStatus { status: to });
        }
        if !job.status.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                job_id: job.job_id.clone(),
                from: job.status,
                to,
            });
        }
        job.status = to;
        if let Some(message) = message {
            job.error_message = Some(message.to_string());
        }
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn register(&self, new_job: NewJob) -> Result<RegistrationOutcome, StoreError> {
        match self.jobs.entry(new_job.job_id.clone()) {
            Entry::Occupied(_) => Ok(RegistrationOutcome::AlreadyExists),
            Entry::Vacant(vacant) => {
                vacant.insert(Job::from_new(new_job));
                Ok(RegistrationOutcome::Created)
            }
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(job_id).map(|entry| entry.clone()))
    }

    async fn find_by_correlation_key(&self, key: &str) -> Result<Option<Job>, StoreError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.source_correlation_key == key)
            .map(|entry| entry.clone())
            .max_by_key(|job| job.created_at))
    }

    async fn increment_processed(&self, job_id: &str) -> Result<u32, StoreError> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        entry.processed_batches = entry
            .processed_batches
            .saturating_add(1)
            .min(entry.total_batches);
        entry.updated_at = Utc::now();
        Ok(entry.processed_batches)
    }

    async fn update_status(&self, job_id: &str, to: JobStatus) -> Result<(), StoreError> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        Self::guarded_transition(&mut entry, to, None)
    }

    async fn mark_failed(
        &self,
        job_id: &str,
        to: JobStatus,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        Self::guarded_transition(&mut entry, to, Some(message))
    }

    async fn record_intake_failure(
        &self,
        job_id: &str,
        correlation_key: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        match self.jobs.entry(job_id.to_string()) {
            Entry::Vacant(vacant) => {
                let mut job = Job::from_new(NewJob {
                    job_id: job_id.to_string(),
                    total_batches: 0,
                    source_correlation_key: correlation_key.to_string(),
                });
                job.status = JobStatus::SplitterFailed;
                job.error_message = Some(message.to_string());
                vacant.insert(job);
            }
            Entry::Occupied(mut occupied) => {
                let job = occupied.get_mut();
                if job.status == JobStatus::InProgress {
                    job.status = JobStatus::SplitterFailed;
                    job.error_message = Some(message.to_string());
                    job.updated_at = Utc::now();
                } else {
                    warn!(
                        job_id = %job_id,
                        status = %job.status,
                        "Intake failure reported for a job no longer in progress, leaving stored status"
                    );
                }
            }
        }
        Ok(())
    }
}
