//! # Review Record
//!
//! One review flowing through the pipeline. The splitter fills `text` and
//! `rating`; each enrichment stage adds exactly one derived column and leaves
//! everything else untouched; the stitcher adds the corpus-level topic
//! cluster id last.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Sanitized review text, title-prefixed when a title column was mapped
    pub text: String,

    /// Numeric rating passed through untouched by every stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    /// Stage 1: sentiment classification label (or its error sentinel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,

    /// Stage 2: single topical classification label (or a sentinel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Stage 3: formatted retained aspect labels (or a sentinel)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspects: Option<String>,

    /// Corpus-level topic cluster id, assigned by the stitcher (-1 = outlier)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_cluster: Option<i64>,
}

impl ReviewRecord {
    pub fn new(text: impl Into<String>, rating: Option<f64>) -> Self {
        Self {
            text: text.into(),
            rating,
            sentiment: None,
            topic: None,
            aspects: None,
            topic_cluster: None,
        }
    }
}
