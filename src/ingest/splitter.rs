//! # Splitter
//!
//! Intake orchestration: one uploaded dataset becomes one registered job and
//! N dispatched batch executions, idempotently.
//!
//! ## Identity
//!
//! The job id is the lowercase-hex SHA-256 of the uploaded bytes. Re-uploads
//! of identical content (retries, copies under new keys) hash to the same id
//! and short-circuit at registration without dispatching anything.
//!
//! ## Failure contract
//!
//! Once the job id is computable, any intake failure leaves a diagnosable
//! `SPLITTER_FAILED` record behind (upserted, so even a failure before
//! registration lands somewhere an operator can find) and then propagates.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument};

use super::mapping::ColumnMapping;
use super::{dataset, IntakeError};
use crate::models::{BatchExecution, NewJob};
use crate::pipeline::BatchDispatcher;
use crate::store::{JobStore, RegistrationOutcome};

/// The ingestion trigger payload: object identity, metadata, content.
#[derive(Debug, Clone)]
pub struct DatasetUpload {
    pub bucket: String,
    pub key: String,
    pub metadata: HashMap<String, String>,
    pub content: Bytes,
}

impl DatasetUpload {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        metadata: HashMap<String, String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            metadata,
            content: content.into(),
        }
    }

    /// Content-hash job identity: lowercase hex SHA-256 of the bytes.
    pub fn job_id(&self) -> String {
        let digest = Sha256::digest(&self.content);
        let mut rendered = String::with_capacity(digest.len() * 2);
        for byte in digest {
            use std::fmt::Write;
            let _ = write!(rendered, "{byte:02x}");
        }
        rendered
    }

    /// Reverse-lookup key recorded on the job: the bucket-qualified parent
    /// prefix of the uploaded object.
    pub fn correlation_key(&self) -> String {
        match self.key.rfind('/') {
            Some(position) => format!("{}/{}/", self.bucket, &self.key[..position]),
            None => format!("{}/", self.bucket),
        }
    }
}

/// What intake did for this upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// A new job was registered and its batches dispatched.
    Started { job_id: String, total_batches: u32 },
    /// The content hash was already registered; nothing was dispatched.
    Duplicate { job_id: String },
}

impl IntakeOutcome {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Started { job_id, .. } | Self::Duplicate { job_id } => job_id,
        }
    }
}

/// Turns uploads into registered jobs plus dispatched batches.
pub struct Splitter {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn BatchDispatcher>,
    batch_size: usize,
}

impl Splitter {
    pub fn new(
        store: Arc<dyn JobStore>,
        dispatcher: Arc<dyn BatchDispatcher>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            dispatcher,
            batch_size,
        }
    }

    /// Ingest one upload end to end.
    #[instrument(skip(self, upload), fields(bucket = %upload.bucket, key = %upload.key))]
    pub async fn ingest(&self, upload: DatasetUpload) -> Result<IntakeOutcome, IntakeError> {
        let job_id = upload.job_id();
        let correlation_key = upload.correlation_key();

        match self.try_ingest(&job_id, &correlation_key, &upload).await {
            Ok(outcome) => Ok(outcome),
            Err(intake_error) => {
                // Leave the diagnosable record before propagating
                if let Err(store_error) = self
                    .store
                    .record_intake_failure(&job_id, &correlation_key, &intake_error.to_string())
                    .await
                {
                    error!(
                        job_id = %job_id,
                        error = %store_error,
                        "Failed to record intake failure"
                    );
                }
                error!(job_id = %job_id, error = %intake_error, "Intake failed");
                Err(intake_error)
            }
        }
    }

    async fn try_ingest(
        &self,
        job_id: &str,
        correlation_key: &str,
        upload: &DatasetUpload,
    ) -> Result<IntakeOutcome, IntakeError> {
        let mapping = ColumnMapping::from_metadata(&upload.metadata)?;
        let records = dataset::parse_records(&upload.content, &mapping)?;
        let batches = dataset::partition(records, self.batch_size);
        let total_batches = batches.len() as u32;

        let registration = self
            .store
            .register(NewJob {
                job_id: job_id.to_string(),
                total_batches,
                source_correlation_key: correlation_key.to_string(),
            })
            .await?;

        if registration == RegistrationOutcome::AlreadyExists {
            info!(job_id = %job_id, "Duplicate upload content, skipping fan-out");
            return Ok(IntakeOutcome::Duplicate {
                job_id: job_id.to_string(),
            });
        }

        let config = mapping.enrichment_config();
        for batch in batches {
            self.dispatcher
                .dispatch(BatchExecution::new(job_id, batch, config.clone()))
                .await?;
        }

        info!(
            job_id = %job_id,
            total_batches = total_batches,
            "📦 Job registered and batches dispatched"
        );
        Ok(IntakeOutcome::Started {
            job_id: job_id.to_string(),
            total_batches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(bucket: &str, key: &str, content: &[u8]) -> DatasetUpload {
        DatasetUpload::new(bucket, key, HashMap::new(), content.to_vec())
    }

    #[test]
    fn test_job_id_is_stable_for_identical_content() {
        let first = upload("bronze", "uploads/a/reviews.csv", b"same bytes");
        let second = upload("bronze", "uploads/b/copy.csv", b"same bytes");
        assert_eq!(first.job_id(), second.job_id());
        assert_eq!(first.job_id().len(), 64);
    }

    #[test]
    fn test_job_id_differs_for_different_content() {
        let first = upload("bronze", "uploads/a/reviews.csv", b"one dataset");
        let second = upload("bronze", "uploads/a/reviews.csv", b"another dataset");
        assert_ne!(first.job_id(), second.job_id());
    }

    #[test]
    fn test_correlation_key_is_parent_prefix() {
        let with_dirs = upload("bronze", "uploads/9f3a/reviews.csv", b"x");
        assert_eq!(with_dirs.correlation_key(), "bronze/uploads/9f3a/");

        let bare = upload("bronze", "reviews.csv", b"x");
        assert_eq!(bare.correlation_key(), "bronze/");
    }
}
