//! # Enrichment Stages
//!
//! The three derived-column stages applied to every batch, in order:
//! sentiment, topical classification, aspect extraction. Each stage walks
//! the batch record by record and fills exactly one column.
//!
//! Inference failures are contained per record: a failed prediction writes
//! a sentinel string into the derived column and the walk continues. Only
//! an unavailable model aborts the batch, handing it back to the dispatch
//! substrate for retry.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    parse_label_list, ASPECT_ERROR_SENTINEL, ASPECT_NONE_SENTINEL, DEFAULT_ASPECT_LABELS,
    DEFAULT_TOPIC_LABELS, MAX_ASPECT_WORDS, MAX_CLASSIFIER_CHARS, SENTIMENT_ERROR_SENTINEL,
    TOPIC_ERROR_SENTINEL, TOPIC_NO_LABELS_SENTINEL, TOPIC_NO_TEXT_SENTINEL,
};
use crate::inference::{InferenceError, LabelScorer, SentimentModel};
use crate::ingest::sanitize_text;
use crate::models::{EnrichmentConfig, RecordBatch};

/// Batch-fatal stage failure. Per-record prediction failures never surface
/// here; they become sentinel values inside the batch.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Stage '{stage}' unavailable: {message}")]
    Unavailable { stage: &'static str, message: String },
}

/// One derived-column pass over a batch.
///
/// Implementations own their model handle and their input shaping
/// (truncation, sanitization). `enrich` takes the batch by value and hands
/// it back so the runner can thread it through the chain.
#[async_trait]
pub trait EnrichmentStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enrich(
        &self,
        batch: RecordBatch,
        config: &EnrichmentConfig,
    ) -> Result<RecordBatch, StageError>;
}

/// Sanitize and clip text for the sentiment and topic classifiers.
pub(crate) fn prepare_classifier_input(text: &str) -> String {
    let cleaned = sanitize_text(text);
    cleaned.chars().take(MAX_CLASSIFIER_CHARS).collect()
}

/// Sanitize and clip text for aspect extraction, which bounds by word
/// count rather than characters.
pub(crate) fn prepare_aspect_input(text: &str) -> String {
    let cleaned = sanitize_text(text);
    cleaned
        .split_whitespace()
        .take(MAX_ASPECT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stage 1: overall sentiment label per record.
pub struct SentimentStage {
    model: Arc<dyn SentimentModel>,
}

impl SentimentStage {
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl EnrichmentStage for SentimentStage {
    fn name(&self) -> &'static str {
        "sentiment"
    }

    async fn enrich(
        &self,
        mut batch: RecordBatch,
        _config: &EnrichmentConfig,
    ) -> Result<RecordBatch, StageError> {
        for record in &mut batch.records {
            let text = prepare_classifier_input(&record.text);
            let sentiment = match self.model.classify(&text).await {
                Ok(label) => label,
                Err(InferenceError::Prediction(message)) => {
                    warn!(
                        stage = self.name(),
                        error = %message,
                        "Prediction failed, recording sentinel"
                    );
                    SENTIMENT_ERROR_SENTINEL.to_string()
                }
                Err(InferenceError::Unavailable(message)) => {
                    return Err(StageError::Unavailable {
                        stage: self.name(),
                        message,
                    });
                }
            };
            record.sentiment = Some(sentiment);
        }
        Ok(batch)
    }
}

/// Stage 2: single best-fit topic label per record, chosen from the
/// job-scoped candidate list (or the built-in default list).
pub struct TopicStage {
    scorer: Arc<dyn LabelScorer>,
}

impl TopicStage {
    pub fn new(scorer: Arc<dyn LabelScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl EnrichmentStage for TopicStage {
    fn name(&self) -> &'static str {
        "topic"
    }

    async fn enrich(
        &self,
        mut batch: RecordBatch,
        config: &EnrichmentConfig,
    ) -> Result<RecordBatch, StageError> {
        let labels = parse_label_list(
            config
                .topic_labels
                .as_deref()
                .unwrap_or(DEFAULT_TOPIC_LABELS),
        );

        for record in &mut batch.records {
            let text = prepare_classifier_input(&record.text);
            let topic = if text.is_empty() {
                TOPIC_NO_TEXT_SENTINEL.to_string()
            } else if labels.is_empty() {
                TOPIC_NO_LABELS_SENTINEL.to_string()
            } else {
                match self.scorer.score(&text, &labels).await {
                    Ok(scored) => scored
                        .first()
                        .map(|candidate| candidate.label.clone())
                        .unwrap_or_else(|| TOPIC_NO_LABELS_SENTINEL.to_string()),
                    Err(InferenceError::Prediction(message)) => {
                        warn!(
                            stage = self.name(),
                            error = %message,
                            "Prediction failed, recording sentinel"
                        );
                        TOPIC_ERROR_SENTINEL.to_string()
                    }
                    Err(InferenceError::Unavailable(message)) => {
                        return Err(StageError::Unavailable {
                            stage: self.name(),
                            message,
                        });
                    }
                }
            };
            record.topic = Some(topic);
        }
        Ok(batch)
    }
}

/// Stage 3: every aspect label scoring at or above the threshold, rendered
/// as `"label (score)"` pairs joined with `", "`.
pub struct AspectStage {
    scorer: Arc<dyn LabelScorer>,
    threshold: f64,
}

impl AspectStage {
    pub fn new(scorer: Arc<dyn LabelScorer>, threshold: f64) -> Self {
        Self { scorer, threshold }
    }
}

#[async_trait]
impl EnrichmentStage for AspectStage {
    fn name(&self) -> &'static str {
        "aspects"
    }

    async fn enrich(
        &self,
        mut batch: RecordBatch,
        config: &EnrichmentConfig,
    ) -> Result<RecordBatch, StageError> {
        let labels = parse_label_list(
            config
                .aspect_labels
                .as_deref()
                .unwrap_or(DEFAULT_ASPECT_LABELS),
        );

        for record in &mut batch.records {
            let text = prepare_aspect_input(&record.text);
            let aspects = if text.is_empty() || labels.is_empty() {
                ASPECT_NONE_SENTINEL.to_string()
            } else {
                match self.scorer.score(&text, &labels).await {
                    Ok(scored) => {
                        let retained: Vec<String> = scored
                            .iter()
                            .filter(|candidate| candidate.score >= self.threshold)
                            .map(|candidate| {
                                format!("{} ({:.2})", candidate.label, candidate.score)
                            })
                            .collect();
                        if retained.is_empty() {
                            ASPECT_NONE_SENTINEL.to_string()
                        } else {
                            retained.join(", ")
                        }
                    }
                    Err(InferenceError::Prediction(message)) => {
                        warn!(
                            stage = self.name(),
                            error = %message,
                            "Prediction failed, recording sentinel"
                        );
                        ASPECT_ERROR_SENTINEL.to_string()
                    }
                    Err(InferenceError::Unavailable(message)) => {
                        return Err(StageError::Unavailable {
                            stage: self.name(),
                            message,
                        });
                    }
                }
            };
            record.aspects = Some(aspects);
        }
        Ok(batch)
    }
}
