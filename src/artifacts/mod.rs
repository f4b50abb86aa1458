//! # Artifact Store
//!
//! One abstraction over the two artifact areas the engine owns:
//!
//! - the **intermediate** area, one document per successful batch execution,
//!   keyed `{silver}/processed-batches/{job_id}/{execution_id}.json`
//! - the **results** area, the stitched report and its topic summary, keyed
//!   `{gold}/{job_id}.json` and `{gold}/{job_id}_topics.json`
//!
//! Generic over [`object_store::ObjectStore`], so the local filesystem used
//! by tests and single-node deployments swaps for S3/GCS without touching
//! callers. Documents are serde_json; the store treats bytes as opaque.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::constants::INTERMEDIATE_BATCH_AREA;
use crate::inference::TopicInfo;
use crate::models::{RecordBatch, ReviewRecord};

const DELETE_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("Artifact codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Artifact root error: {0}")]
    Root(#[from] std::io::Error),
}

/// Key layout for both artifact areas.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub silver_prefix: String,
    pub gold_prefix: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            silver_prefix: "silver".to_string(),
            gold_prefix: "gold".to_string(),
        }
    }
}

impl ArtifactLayout {
    pub fn new(silver_prefix: impl Into<String>, gold_prefix: impl Into<String>) -> Self {
        Self {
            silver_prefix: silver_prefix.into(),
            gold_prefix: gold_prefix.into(),
        }
    }

    /// Prefix every intermediate artifact of a job lives under.
    pub fn batch_prefix(&self, job_id: &str) -> ObjectPath {
        ObjectPath::from(format!(
            "{}/{}/{}",
            self.silver_prefix, INTERMEDIATE_BATCH_AREA, job_id
        ))
    }

    /// Key for one batch execution's artifact.
    pub fn batch_key(&self, job_id: &str, execution_id: Uuid) -> ObjectPath {
        ObjectPath::from(format!(
            "{}/{}/{}/{}.json",
            self.silver_prefix, INTERMEDIATE_BATCH_AREA, job_id, execution_id
        ))
    }

    /// Key for the stitched report.
    pub fn report_key(&self, job_id: &str) -> ObjectPath {
        ObjectPath::from(format!("{}/{}.json", self.gold_prefix, job_id))
    }

    /// Key for the topic summary that accompanies the report.
    pub fn topic_summary_key(&self, job_id: &str) -> ObjectPath {
        ObjectPath::from(format!("{}/{}_topics.json", self.gold_prefix, job_id))
    }
}

/// Read/write access to both artifact areas.
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    layout: ArtifactLayout,
}

impl ArtifactStore {
    pub fn new(store: Arc<dyn ObjectStore>, layout: ArtifactLayout) -> Self {
        Self { store, layout }
    }

    /// Store backed by the local filesystem, creating the root if needed.
    pub fn local(root: &std::path::Path, layout: ArtifactLayout) -> Result<Self, ArtifactError> {
        std::fs::create_dir_all(root)?;
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store), layout))
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Persist one enriched batch under a fresh execution id key.
    pub async fn write_batch(
        &self,
        job_id: &str,
        execution_id: Uuid,
        batch: &RecordBatch,
    ) -> Result<ObjectPath, ArtifactError> {
        let key = self.layout.batch_key(job_id, execution_id);
        let payload = PutPayload::from(serde_json::to_vec(batch)?);
        self.store.put(&key, payload).await?;
        debug!(job_id = %job_id, key = %key, records = batch.len(), "Wrote batch artifact");
        Ok(key)
    }

    /// All intermediate artifact keys for a job, lexicographically sorted so
    /// the merge order is deterministic for a given artifact set.
    pub async fn list_batch_paths(&self, job_id: &str) -> Result<Vec<ObjectPath>, ArtifactError> {
        let prefix = self.layout.batch_prefix(job_id);
        let entries: Vec<ObjectMeta> = self.store.list(Some(&prefix)).try_collect().await?;
        let mut paths: Vec<ObjectPath> = entries.into_iter().map(|meta| meta.location).collect();
        paths.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        Ok(paths)
    }

    pub async fn read_batch(&self, path: &ObjectPath) -> Result<RecordBatch, ArtifactError> {
        let data = self.store.get(path).await?.bytes().await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Delete every intermediate artifact of a job; returns how many went.
    pub async fn delete_batches(&self, job_id: &str) -> Result<usize, ArtifactError> {
        let paths = self.list_batch_paths(job_id).await?;
        let count = paths.len();
        let store = &self.store;
        stream::iter(paths)
            .map(|path| async move { store.delete(&path).await })
            .buffer_unordered(DELETE_CONCURRENCY)
            .try_collect::<Vec<()>>()
            .await?;
        debug!(job_id = %job_id, deleted = count, "Deleted intermediate batch artifacts");
        Ok(count)
    }

    pub async fn write_report(
        &self,
        job_id: &str,
        records: &[ReviewRecord],
    ) -> Result<ObjectPath, ArtifactError> {
        let key = self.layout.report_key(job_id);
        let payload = PutPayload::from(serde_json::to_vec(records)?);
        self.store.put(&key, payload).await?;
        Ok(key)
    }

    pub async fn read_report(&self, job_id: &str) -> Result<Vec<ReviewRecord>, ArtifactError> {
        let key = self.layout.report_key(job_id);
        let data = self.store.get(&key).await?.bytes().await?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn write_topic_summary(
        &self,
        job_id: &str,
        topics: &[TopicInfo],
    ) -> Result<ObjectPath, ArtifactError> {
        let key = self.layout.topic_summary_key(job_id);
        let payload = PutPayload::from(serde_json::to_vec(topics)?);
        self.store.put(&key, payload).await?;
        Ok(key)
    }

    pub async fn read_topic_summary(&self, job_id: &str) -> Result<Vec<TopicInfo>, ArtifactError> {
        let key = self.layout.topic_summary_key(job_id);
        let data = self.store.get(&key).await?.bytes().await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Raw bytes of an artifact, for callers comparing runs.
    pub async fn read_raw(&self, path: &ObjectPath) -> Result<Bytes, ArtifactError> {
        Ok(self.store.get(path).await?.bytes().await?)
    }
}
