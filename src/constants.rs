//! # System Constants
//!
//! Core constants that define the operational boundaries of the ReviewFlow
//! enrichment engine: batch sizing, stage input limits, sentinel values, and
//! default label sets.
//!
//! Sentinels and defaults are part of the wire contract with downstream
//! consumers of the enriched artifacts, so they live here rather than in
//! configuration.

/// Default number of records per dispatched batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default candidate labels for the topical classification stage,
/// comma-separated. Used when the upload metadata supplies none.
pub const DEFAULT_TOPIC_LABELS: &str = "price,quality,shipping,customer service,fit,fabric";

/// Default candidate labels for the aspect extraction stage, comma-separated.
pub const DEFAULT_ASPECT_LABELS: &str = "slow delivery,fast delivery,damaged box,good quality,\
poor quality,good fit,tight fit,good price,expensive";

/// Minimum score for an aspect label to be retained in the derived column.
pub const DEFAULT_ASPECT_SCORE_THRESHOLD: f64 = 0.6;

/// Character budget for classifier inputs (sentiment and topical stages).
pub const MAX_CLASSIFIER_CHARS: usize = 512;

/// Word budget for aspect extraction inputs.
pub const MAX_ASPECT_WORDS: usize = 400;

// Per-record failure sentinels. A failed inference never fails the batch;
// the derived column carries the sentinel instead.
pub const SENTIMENT_ERROR_SENTINEL: &str = "ERROR";
pub const TOPIC_ERROR_SENTINEL: &str = "ERROR";
pub const TOPIC_NO_TEXT_SENTINEL: &str = "N/A (No text provided)";
pub const TOPIC_NO_LABELS_SENTINEL: &str = "N/A (No labels provided)";
pub const ASPECT_NONE_SENTINEL: &str = "N/A";
pub const ASPECT_ERROR_SENTINEL: &str = "PREDICTION_ERROR";

/// Topic id assigned to records that no discovered cluster claims.
pub const OUTLIER_TOPIC_ID: i64 = -1;

/// Key segment under the intermediate prefix where per-batch artifacts live.
pub const INTERMEDIATE_BATCH_AREA: &str = "processed-batches";

/// Parse a comma-separated label string into trimmed, non-empty labels.
pub fn parse_label_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ToString::to_string)
        .collect()
}
