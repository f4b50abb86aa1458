//! # Record Batches and the Dispatch Envelope
//!
//! The splitter partitions a dataset into [`RecordBatch`]es and wraps each in
//! a [`BatchExecution`] envelope: job identity plus the per-job enrichment
//! configuration every stage needs. The envelope is the unit the dispatch
//! substrate delivers (at least once) to the pipeline runner.

use serde::{Deserialize, Serialize};

use super::record::ReviewRecord;

/// A fixed-size slice of the dataset; the unit of fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    /// Zero-based position of this batch within the dataset
    pub batch_index: u32,
    pub records: Vec<ReviewRecord>,
}

impl RecordBatch {
    pub fn new(batch_index: u32, records: Vec<ReviewRecord>) -> Self {
        Self {
            batch_index,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-job knobs forwarded to the enrichment stages.
///
/// Label sets are raw comma-separated strings exactly as the upload metadata
/// supplied them; stages parse and fall back to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_labels: Option<String>,
}

/// The typed message handed to the dispatch substrate, one per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExecution {
    pub job_id: String,
    pub batch: RecordBatch,
    pub config: EnrichmentConfig,
}

impl BatchExecution {
    pub fn new(job_id: impl Into<String>, batch: RecordBatch, config: EnrichmentConfig) -> Self {
        Self {
            job_id: job_id.into(),
            batch,
            config,
        }
    }
}
