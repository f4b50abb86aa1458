//! Shared helpers for integration tests: CSV builders, upload construction,
//! system assembly against temp-dir artifact roots, and test doubles for the
//! dispatch and inference seams.

#![allow(dead_code)] // Not every test binary uses every helper

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use reviewflow_core::config::ReviewFlowConfig;
use reviewflow_core::inference::{InferenceError, SentimentModel, TopicDiscovery, TopicModel};
use reviewflow_core::ingest::{DatasetUpload, MAPPING_METADATA_KEY};
use reviewflow_core::models::BatchExecution;
use reviewflow_core::pipeline::{BatchDispatcher, DispatchError};
use reviewflow_core::system::ReviewFlowSystem;

/// A CSV with `rows` review rows under the canonical test header.
pub fn review_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from("review_body,review_title,stars\n");
    for index in 0..rows {
        let noun = if index % 2 == 0 { "fabric" } else { "shipping" };
        csv.push_str(&format!(
            "the {noun} was notable and the {noun} held up well in wash {index},Review {index},{}\n",
            (index % 5) + 1
        ));
    }
    csv.into_bytes()
}

/// A header-only CSV, which registers a zero-batch job.
pub fn empty_csv() -> Vec<u8> {
    b"review_body,review_title,stars\n".to_vec()
}

/// Metadata carrying the canonical column mapping for [`review_csv`].
pub fn mapping_metadata() -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert(
        MAPPING_METADATA_KEY.to_string(),
        r#"{"full_review_text": "review_body", "title": "review_title", "rating": "stars"}"#
            .to_string(),
    );
    metadata
}

/// An upload landing under the default source bucket's `uploads/{id}/` area,
/// matching what the find-job endpoint reconstructs.
pub fn upload_under(upload_id: &str, content: Vec<u8>) -> DatasetUpload {
    DatasetUpload::new(
        "reviewflow-bronze",
        format!("uploads/{upload_id}/reviews.csv"),
        mapping_metadata(),
        content,
    )
}

/// A memory-backend config rooted in the given temp dir, with fast retries.
pub fn test_config(dir: &tempfile::TempDir, batch_size: usize) -> ReviewFlowConfig {
    let mut config = ReviewFlowConfig::default();
    config.storage.data_root = dir.path().to_path_buf();
    config.pipeline.batch_size = batch_size;
    config.pipeline.dispatch_backoff_ms = 1;
    config
}

/// A fully assembled system over the memory backend and keyword models.
pub async fn test_system(dir: &tempfile::TempDir, batch_size: usize) -> Arc<ReviewFlowSystem> {
    ReviewFlowSystem::bootstrap(test_config(dir, batch_size))
        .await
        .expect("test system bootstrap")
}

/// Dispatcher double that records executions without running anything.
#[derive(Default)]
pub struct RecordingDispatcher {
    dispatched: AtomicUsize,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchDispatcher for RecordingDispatcher {
    async fn dispatch(&self, _execution: BatchExecution) -> Result<(), DispatchError> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sentiment model that fails per-record on a marker substring.
pub struct PoisonSentimentModel {
    pub needle: &'static str,
}

#[async_trait]
impl SentimentModel for PoisonSentimentModel {
    async fn classify(&self, text: &str) -> Result<String, InferenceError> {
        if text.contains(self.needle) {
            return Err(InferenceError::Prediction("marker hit".to_string()));
        }
        Ok("NEUTRAL".to_string())
    }
}

/// Sentiment model that is always down, aborting every batch execution.
pub struct DownSentimentModel;

#[async_trait]
impl SentimentModel for DownSentimentModel {
    async fn classify(&self, _text: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Unavailable("model service down".to_string()))
    }
}

/// Topic model that is always down, failing every stitch.
pub struct DownTopicModel;

#[async_trait]
impl TopicModel for DownTopicModel {
    async fn discover(&self, _docs: &[String]) -> Result<TopicDiscovery, InferenceError> {
        Err(InferenceError::Unavailable("clustering service down".to_string()))
    }
}
