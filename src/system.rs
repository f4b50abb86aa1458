//! # System Wiring
//!
//! Assembles the engine from configuration: job store backend, artifact
//! store, the enrichment runner with its local dispatch substrate, the
//! splitter, the stitcher, and the status API state. This is the composition
//! root used by the server binary and by integration tests.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::aggregate::Stitcher;
use crate::artifacts::{ArtifactLayout, ArtifactStore};
use crate::config::{ConfigError, ReviewFlowConfig, StorageBackend};
use crate::error::Result;
use crate::inference::{
    KeywordLabelScorer, KeywordTopicModel, LabelScorer, LexiconSentimentModel, SentimentModel,
    TopicModel,
};
use crate::ingest::Splitter;
use crate::pipeline::{BatchDispatcher, BatchPipelineRunner, LocalDispatcher, RetryPolicy};
use crate::store::{JobStore, MemoryJobStore, PgJobStore};
use crate::web::{self, AppState};

/// Model handles behind the three stages and topic discovery.
///
/// Defaults to the deterministic keyword built-ins, which keep the engine
/// fully runnable with no external model service.
pub struct ModelSet {
    pub sentiment: Arc<dyn SentimentModel>,
    pub scorer: Arc<dyn LabelScorer>,
    pub topics: Arc<dyn TopicModel>,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            sentiment: Arc::new(LexiconSentimentModel::new()),
            scorer: Arc::new(KeywordLabelScorer::new()),
            topics: Arc::new(KeywordTopicModel::default()),
        }
    }
}

/// The assembled engine.
pub struct ReviewFlowSystem {
    config: ReviewFlowConfig,
    store: Arc<dyn JobStore>,
    artifacts: Arc<ArtifactStore>,
    dispatcher: Arc<LocalDispatcher>,
    splitter: Splitter,
    stitcher: Arc<Stitcher>,
}

impl ReviewFlowSystem {
    /// Bootstrap with the built-in keyword models.
    pub async fn bootstrap(config: ReviewFlowConfig) -> Result<Arc<Self>> {
        Self::bootstrap_with_models(config, ModelSet::default()).await
    }

    /// Bootstrap with caller-supplied model handles.
    pub async fn bootstrap_with_models(
        config: ReviewFlowConfig,
        models: ModelSet,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let store: Arc<dyn JobStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryJobStore::new()),
            StorageBackend::Postgres => {
                let url = config.storage.database_url.as_deref().ok_or_else(|| {
                    ConfigError::Invalid {
                        message: "storage.database_url is required for the postgres backend"
                            .to_string(),
                    }
                })?;
                Arc::new(PgJobStore::connect(url).await?)
            }
        };

        let layout = ArtifactLayout::new(
            config.storage.silver_prefix.clone(),
            config.storage.gold_prefix.clone(),
        );
        let artifacts = Arc::new(ArtifactStore::local(&config.storage.data_root, layout)?);

        let runner = Arc::new(BatchPipelineRunner::standard(
            Arc::clone(&store),
            Arc::clone(&artifacts),
            models.sentiment,
            models.scorer,
            config.pipeline.aspect_score_threshold,
        ));
        let retry = RetryPolicy::new(
            config.pipeline.dispatch_max_attempts,
            Duration::from_millis(config.pipeline.dispatch_backoff_ms),
        );
        let dispatcher = Arc::new(LocalDispatcher::new(runner, retry));

        let splitter = Splitter::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher) as Arc<dyn BatchDispatcher>,
            config.pipeline.batch_size,
        );
        let stitcher = Arc::new(Stitcher::new(
            Arc::clone(&store),
            Arc::clone(&artifacts),
            models.topics,
        ));

        info!(
            backend = ?config.storage.backend,
            batch_size = config.pipeline.batch_size,
            data_root = %config.storage.data_root.display(),
            "ReviewFlow system bootstrapped"
        );

        Ok(Arc::new(Self {
            config,
            store,
            artifacts,
            dispatcher,
            splitter,
            stitcher,
        }))
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    pub fn stitcher(&self) -> Arc<Stitcher> {
        Arc::clone(&self.stitcher)
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.store)
    }

    pub fn artifacts(&self) -> Arc<ArtifactStore> {
        Arc::clone(&self.artifacts)
    }

    pub fn config(&self) -> &ReviewFlowConfig {
        &self.config
    }

    /// Wait for every locally dispatched batch execution to settle,
    /// retries included. Used by the ingest CLI path and by tests.
    pub async fn drain_local_dispatch(&self) {
        self.dispatcher.drain().await;
    }

    /// Build the status API state for this system.
    pub fn web_state(&self) -> AppState {
        AppState::new(
            self.store(),
            self.stitcher(),
            self.config.storage.source_bucket.clone(),
            self.config.web.clone(),
        )
    }

    /// Serve the status API until a shutdown signal arrives.
    pub async fn serve_web(&self) -> std::io::Result<()> {
        web::serve(self.web_state()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::DatasetUpload;
    use std::collections::HashMap;

    fn local_config(dir: &tempfile::TempDir) -> ReviewFlowConfig {
        let mut config = ReviewFlowConfig::default();
        config.storage.data_root = dir.path().to_path_buf();
        config.pipeline.batch_size = 2;
        config
    }

    #[tokio::test]
    async fn test_bootstrap_memory_backend() {
        let dir = tempfile::tempdir().unwrap();
        let system = ReviewFlowSystem::bootstrap(local_config(&dir)).await.unwrap();
        assert_eq!(system.config().pipeline.batch_size, 2);
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(&dir);
        config.pipeline.batch_size = 0;
        assert!(ReviewFlowSystem::bootstrap(config).await.is_err());
    }

    #[tokio::test]
    async fn test_ingest_through_the_assembled_system() {
        let dir = tempfile::tempdir().unwrap();
        let system = ReviewFlowSystem::bootstrap(local_config(&dir)).await.unwrap();

        let mut metadata = HashMap::new();
        metadata.insert(
            "mapping".to_string(),
            r#"{"full_review_text": "review_body"}"#.to_string(),
        );
        let upload = DatasetUpload::new(
            "bronze",
            "uploads/demo/reviews.csv",
            metadata,
            b"review_body\ngreat quality\nslow shipping\nlove the fit\n".to_vec(),
        );
        let job_id = upload.job_id();

        let outcome = system.splitter().ingest(upload).await.unwrap();
        assert_eq!(outcome.job_id(), job_id);
        system.drain_local_dispatch().await;

        let job = system.store().get(&job_id).await.unwrap().unwrap();
        assert_eq!(job.total_batches, 2);
        assert_eq!(job.processed_batches, 2);
    }
}
