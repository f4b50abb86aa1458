//! # Batch Pipeline Runner
//!
//! Drives one batch execution end to end: the enrichment chain in stage
//! order, then the intermediate artifact write, then the processed-batches
//! counter bump. The counter moves strictly after the artifact is durable,
//! so a crash between the two can only under-count, never over-count.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::inference::{LabelScorer, SentimentModel};
use crate::models::BatchExecution;
use crate::pipeline::stages::{
    AspectStage, EnrichmentStage, SentimentStage, StageError, TopicStage,
};
use crate::store::{JobStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage failure: {0}")]
    Stage(#[from] StageError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// What one successful batch execution produced.
#[derive(Debug, Clone)]
pub struct BatchRunOutcome {
    pub job_id: String,
    pub batch_index: u32,
    pub execution_id: Uuid,
    /// Counter value after this execution's increment
    pub processed_batches: u32,
    pub records: usize,
}

/// Executes batches against a fixed stage chain.
pub struct BatchPipelineRunner {
    stages: Vec<Arc<dyn EnrichmentStage>>,
    artifacts: Arc<ArtifactStore>,
    store: Arc<dyn JobStore>,
}

impl BatchPipelineRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        artifacts: Arc<ArtifactStore>,
        stages: Vec<Arc<dyn EnrichmentStage>>,
    ) -> Self {
        Self {
            stages,
            artifacts,
            store,
        }
    }

    /// The production chain: sentiment, then topical classification, then
    /// aspect extraction.
    pub fn standard(
        store: Arc<dyn JobStore>,
        artifacts: Arc<ArtifactStore>,
        sentiment: Arc<dyn SentimentModel>,
        scorer: Arc<dyn LabelScorer>,
        aspect_threshold: f64,
    ) -> Self {
        let stages: Vec<Arc<dyn EnrichmentStage>> = vec![
            Arc::new(SentimentStage::new(sentiment)),
            Arc::new(TopicStage::new(Arc::clone(&scorer))),
            Arc::new(AspectStage::new(scorer, aspect_threshold)),
        ];
        Self::new(store, artifacts, stages)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage over the batch, persist the result, bump the counter.
    ///
    /// A stage or artifact error leaves the counter untouched, so a retried
    /// execution re-runs the full chain under a fresh execution id. The
    /// counter never moves without a durable artifact behind it.
    #[instrument(skip(self, execution), fields(
        job_id = %execution.job_id,
        batch_index = execution.batch.batch_index,
    ))]
    pub async fn run(&self, execution: BatchExecution) -> Result<BatchRunOutcome, PipelineError> {
        let BatchExecution {
            job_id,
            mut batch,
            config,
        } = execution;

        for stage in &self.stages {
            debug!(stage = stage.name(), "Running enrichment stage");
            batch = stage.enrich(batch, &config).await?;
        }

        let execution_id = Uuid::new_v4();
        let batch_index = batch.batch_index;
        let records = batch.len();
        self.artifacts
            .write_batch(&job_id, execution_id, &batch)
            .await?;
        let processed_batches = self.store.increment_processed(&job_id).await?;

        info!(
            job_id = %job_id,
            batch_index,
            execution_id = %execution_id,
            processed_batches,
            records,
            "Batch enrichment complete"
        );
        Ok(BatchRunOutcome {
            job_id,
            batch_index,
            execution_id,
            processed_batches,
            records,
        })
    }
}
