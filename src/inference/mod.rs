//! # Inference Seams
//!
//! The ML models behind the enrichment stages and the stitcher's topic
//! discovery are black boxes to this engine. These traits are the seams;
//! everything the orchestration needs from a model fits in one call each.
//!
//! The [`lexicon`] module ships deterministic keyword-driven built-ins so the
//! engine runs end to end with no model dependencies; production models
//! implement the same traits.

pub mod lexicon;

pub use lexicon::{KeywordLabelScorer, KeywordTopicModel, LexiconSentimentModel};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by model calls.
///
/// The two variants carry different blast radii: `Prediction` is scoped to
/// one record and becomes a sentinel value in the derived column, while
/// `Unavailable` aborts the whole batch execution so the dispatch substrate
/// can retry it.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// One scored candidate label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Sentiment classification over one text.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn classify(&self, text: &str) -> Result<String, InferenceError>;
}

/// Scores candidate labels against one text, descending by score.
///
/// Shared by the topical stage (takes the top label) and the aspect stage
/// (thresholds the whole list).
#[async_trait]
pub trait LabelScorer: Send + Sync {
    async fn score(&self, text: &str, labels: &[String])
        -> Result<Vec<LabelScore>, InferenceError>;
}

/// One discovered corpus-level topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Cluster id; `-1` is reserved for the outlier sentinel
    pub topic_id: i64,
    /// Human-readable name derived from the cluster's top keywords
    pub label: String,
    pub keywords: Vec<String>,
    /// Number of documents the cluster claimed
    pub size: u64,
}

/// Result of corpus-level topic discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDiscovery {
    /// One assignment per input document, in input order; `-1` = outlier
    pub assignments: Vec<i64>,
    pub topics: Vec<TopicInfo>,
}

/// Corpus-level topic discovery over the merged job output.
#[async_trait]
pub trait TopicModel: Send + Sync {
    async fn discover(&self, docs: &[String]) -> Result<TopicDiscovery, InferenceError>;
}
