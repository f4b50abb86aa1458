//! # Stitcher
//!
//! Terminal fan-in for a job. One pass over the intermediate artifacts
//! produces the stitched report and its topic summary, then deletes the
//! intermediates and moves the job to its terminal status.
//!
//! Artifacts are merged in lexicographic key order, and the built-in topic
//! models are deterministic, so stitching the same artifact set always
//! yields byte-identical outputs.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::constants::OUTLIER_TOPIC_ID;
use crate::inference::{InferenceError, TopicInfo, TopicModel};
use crate::models::{JobStatus, ReviewRecord};
use crate::store::{JobStore, StoreError};

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Topic discovery error: {0}")]
    Discovery(#[from] InferenceError),
}

/// What a successful stitch call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchOutcome {
    /// Report and topic summary written, intermediates retired.
    Completed { records: usize, topics: usize },
    /// No batch ever completed; the job was moved to
    /// `FAILED_NO_BATCHES_COMPLETED` instead of producing an empty report.
    NoBatches,
}

/// Merges a job's batch artifacts into the final report.
pub struct Stitcher {
    store: Arc<dyn JobStore>,
    artifacts: Arc<ArtifactStore>,
    topic_model: Arc<dyn TopicModel>,
}

impl Stitcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        artifacts: Arc<ArtifactStore>,
        topic_model: Arc<dyn TopicModel>,
    ) -> Self {
        Self {
            store,
            artifacts,
            topic_model,
        }
    }

    /// Claim the job and run the fan-in.
    ///
    /// The claim is the `IN_PROGRESS -> STITCHING` transition; losing it
    /// surfaces as [`StoreError::IllegalTransition`] (or `JobNotFound` for
    /// an unknown id) before any artifact is touched. Every failure after
    /// the claim lands the job in `STITCHING_FAILED` with the error message
    /// recorded, then propagates.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn stitch(&self, job_id: &str) -> Result<StitchOutcome, StitchError> {
        self.store.update_status(job_id, JobStatus::Stitching).await?;
        info!(job_id = %job_id, "Stitch claimed");

        match self.run_stitch(job_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let message = err.to_string();
                if let Err(mark_err) = self
                    .store
                    .mark_failed(job_id, JobStatus::StitchingFailed, &message)
                    .await
                {
                    error!(
                        job_id = %job_id,
                        error = %mark_err,
                        "Could not record stitch failure status"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_stitch(&self, job_id: &str) -> Result<StitchOutcome, StitchError> {
        let paths = self.artifacts.list_batch_paths(job_id).await?;
        if paths.is_empty() {
            warn!(job_id = %job_id, "No completed batches to stitch");
            self.store
                .mark_failed(
                    job_id,
                    JobStatus::FailedNoBatchesCompleted,
                    "No batch completed enrichment",
                )
                .await?;
            return Ok(StitchOutcome::NoBatches);
        }

        let mut records = Vec::new();
        for path in &paths {
            let batch = self.artifacts.read_batch(path).await?;
            records.extend(batch.records);
        }

        let topics = self.assign_topics(&mut records).await?;

        self.artifacts.write_report(job_id, &records).await?;
        self.artifacts.write_topic_summary(job_id, &topics).await?;
        let deleted = self.artifacts.delete_batches(job_id).await?;
        self.store.update_status(job_id, JobStatus::Completed).await?;

        info!(
            job_id = %job_id,
            records = records.len(),
            topics = topics.len(),
            deleted,
            "Stitch complete"
        );
        Ok(StitchOutcome::Completed {
            records: records.len(),
            topics: topics.len(),
        })
    }

    /// Run topic discovery over the non-empty texts and write one cluster id
    /// per record. Records with empty text never reach the model; they get
    /// the outlier id directly, and everything else keeps its input position
    /// when assignments are mapped back.
    async fn assign_topics(
        &self,
        records: &mut [ReviewRecord],
    ) -> Result<Vec<TopicInfo>, StitchError> {
        let mut docs = Vec::new();
        let mut doc_indices = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if !record.text.trim().is_empty() {
                docs.push(record.text.clone());
                doc_indices.push(index);
            }
        }

        for record in records.iter_mut() {
            record.topic_cluster = Some(OUTLIER_TOPIC_ID);
        }

        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let discovery = self.topic_model.discover(&docs).await?;
        for (position, record_index) in doc_indices.iter().enumerate() {
            if let Some(assignment) = discovery.assignments.get(position) {
                records[*record_index].topic_cluster = Some(*assignment);
            }
        }
        Ok(discovery.topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactLayout;
    use crate::inference::{KeywordTopicModel, TopicDiscovery};
    use crate::models::{NewJob, RecordBatch};
    use crate::store::MemoryJobStore;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct RefusingTopicModel;

    #[async_trait]
    impl TopicModel for RefusingTopicModel {
        async fn discover(&self, _docs: &[String]) -> Result<TopicDiscovery, InferenceError> {
            Err(InferenceError::Unavailable("clustering down".to_string()))
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<MemoryJobStore>,
        artifacts: Arc<ArtifactStore>,
        stitcher: Stitcher,
    }

    fn harness_with(topic_model: Arc<dyn TopicModel>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let artifacts =
            Arc::new(ArtifactStore::local(dir.path(), ArtifactLayout::default()).unwrap());
        let store = Arc::new(MemoryJobStore::new());
        let stitcher = Stitcher::new(store.clone(), Arc::clone(&artifacts), topic_model);
        Harness {
            _dir: dir,
            store,
            artifacts,
            stitcher,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(KeywordTopicModel::default()))
    }

    async fn register(harness: &Harness, job_id: &str, total: u32) {
        harness
            .store
            .register(NewJob {
                job_id: job_id.to_string(),
                total_batches: total,
                source_correlation_key: "bucket/uploads/x/".to_string(),
            })
            .await
            .unwrap();
    }

    async fn write_batch(harness: &Harness, job_id: &str, index: u32, texts: &[&str]) {
        let batch = RecordBatch::new(
            index,
            texts
                .iter()
                .map(|text| ReviewRecord::new(*text, Some(4.0)))
                .collect(),
        );
        harness
            .artifacts
            .write_batch(job_id, Uuid::new_v4(), &batch)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stitch_merges_assigns_and_completes() {
        let harness = harness();
        register(&harness, "job-a", 2).await;
        write_batch(
            &harness,
            "job-a",
            0,
            &[
                "fabric quality fabric softness",
                "fabric weave fabric stitching",
            ],
        )
        .await;
        write_batch(
            &harness,
            "job-a",
            1,
            &[
                "shipping delay shipping carrier",
                "shipping box shipping courier",
            ],
        )
        .await;

        let outcome = harness.stitcher.stitch("job-a").await.unwrap();

        assert_eq!(
            outcome,
            StitchOutcome::Completed {
                records: 4,
                topics: 2
            }
        );
        let job = harness.store.get("job-a").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let report = harness.artifacts.read_report("job-a").await.unwrap();
        assert_eq!(report.len(), 4);
        for record in &report {
            assert!(record.topic_cluster.is_some());
        }

        let topics = harness.artifacts.read_topic_summary("job-a").await.unwrap();
        assert_eq!(topics.len(), 2);

        assert!(harness
            .artifacts
            .list_batch_paths("job-a")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_stitch_without_artifacts_fails_the_job() {
        let harness = harness();
        register(&harness, "job-a", 3).await;

        let outcome = harness.stitcher.stitch("job-a").await.unwrap();

        assert_eq!(outcome, StitchOutcome::NoBatches);
        let job = harness.store.get("job-a").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::FailedNoBatchesCompleted);
        assert!(job.error_message.is_some());
    }

    #[tokio::test]
    async fn test_unknown_job_is_rejected_before_any_artifact_work() {
        let harness = harness();
        let result = harness.stitcher.stitch("missing").await;
        assert!(matches!(
            result,
            Err(StitchError::Store(StoreError::JobNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_second_stitch_loses_the_claim() {
        let harness = harness();
        register(&harness, "job-a", 1).await;
        write_batch(&harness, "job-a", 0, &["some review text"]).await;

        harness.stitcher.stitch("job-a").await.unwrap();
        let second = harness.stitcher.stitch("job-a").await;

        assert!(matches!(
            second,
            Err(StitchError::Store(StoreError::IllegalTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_discovery_failure_lands_in_stitching_failed() {
        let harness = harness_with(Arc::new(RefusingTopicModel));
        register(&harness, "job-a", 1).await;
        write_batch(&harness, "job-a", 0, &["some review text"]).await;

        let result = harness.stitcher.stitch("job-a").await;

        assert!(matches!(result, Err(StitchError::Discovery(_))));
        let job = harness.store.get("job-a").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::StitchingFailed);
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .contains("clustering down"));
    }

    #[tokio::test]
    async fn test_empty_texts_take_the_outlier_id_without_touching_the_model() {
        let harness = harness_with(Arc::new(RefusingTopicModel));
        register(&harness, "job-a", 1).await;
        write_batch(&harness, "job-a", 0, &["", "   "]).await;

        let outcome = harness.stitcher.stitch("job-a").await.unwrap();

        assert_eq!(
            outcome,
            StitchOutcome::Completed {
                records: 2,
                topics: 0
            }
        );
        let report = harness.artifacts.read_report("job-a").await.unwrap();
        for record in &report {
            assert_eq!(record.topic_cluster, Some(OUTLIER_TOPIC_ID));
        }
    }
}
