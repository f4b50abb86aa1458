//! # Column Mapping
//!
//! The uploader describes its CSV schema through a JSON document stored in
//! the upload metadata under the `mapping` key. Only the text column is
//! mandatory; title, rating, and per-job label sets are optional.
//!
//! Wire key names (`full_review_text`, `title`, `rating`, `zero_shot_labels`,
//! `absa_labels`) are the uploader contract and stay fixed; field names on
//! this struct follow the engine's vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::IntakeError;
use crate::models::EnrichmentConfig;

/// Metadata key the serialized mapping document lives under.
pub const MAPPING_METADATA_KEY: &str = "mapping";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// CSV column holding the review body
    #[serde(rename = "full_review_text")]
    pub text_column: String,

    /// Optional CSV column prepended to the review body
    #[serde(rename = "title", default, skip_serializing_if = "Option::is_none")]
    pub title_column: Option<String>,

    /// Optional CSV column parsed as a numeric rating
    #[serde(rename = "rating", default, skip_serializing_if = "Option::is_none")]
    pub rating_column: Option<String>,

    /// Comma-separated candidate labels for the topical stage
    #[serde(
        rename = "zero_shot_labels",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub topic_labels: Option<String>,

    /// Comma-separated candidate labels for the aspect stage
    #[serde(
        rename = "absa_labels",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub aspect_labels: Option<String>,
}

impl ColumnMapping {
    pub fn new(text_column: impl Into<String>) -> Self {
        Self {
            text_column: text_column.into(),
            title_column: None,
            rating_column: None,
            topic_labels: None,
            aspect_labels: None,
        }
    }

    /// Parse and validate the mapping document out of upload metadata.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, IntakeError> {
        let raw = metadata.get(MAPPING_METADATA_KEY).ok_or_else(|| {
            IntakeError::Validation("upload metadata is missing the column mapping".to_string())
        })?;
        let mapping: ColumnMapping = serde_json::from_str(raw).map_err(|e| {
            IntakeError::Validation(format!("column mapping is not valid JSON: {e}"))
        })?;
        if mapping.text_column.trim().is_empty() {
            return Err(IntakeError::Validation(
                "column mapping names an empty text column".to_string(),
            ));
        }
        Ok(mapping)
    }

    /// Every CSV column the mapping references.
    pub fn mapped_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.text_column.as_str()];
        if let Some(title) = &self.title_column {
            columns.push(title.as_str());
        }
        if let Some(rating) = &self.rating_column {
            columns.push(rating.as_str());
        }
        columns
    }

    /// Check that every mapped column exists in the dataset header.
    pub fn validate_against_header(&self, headers: &csv::StringRecord) -> Result<(), IntakeError> {
        for column in self.mapped_columns() {
            if !headers.iter().any(|header| header == column) {
                return Err(IntakeError::Validation(format!(
                    "mapped column '{column}' not found in dataset header"
                )));
            }
        }
        Ok(())
    }

    /// The per-job stage configuration carried by every batch envelope.
    pub fn enrichment_config(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            topic_labels: self.topic_labels.clone(),
            aspect_labels: self.aspect_labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_with(mapping_json: &str) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert(MAPPING_METADATA_KEY.to_string(), mapping_json.to_string());
        metadata
    }

    #[test]
    fn test_full_mapping_parses() {
        let metadata = metadata_with(
            r#"{"full_review_text": "body", "title": "headline", "rating": "stars",
                "zero_shot_labels": "price,quality", "absa_labels": "good fit,tight fit"}"#,
        );
        let mapping = ColumnMapping::from_metadata(&metadata).unwrap();
        assert_eq!(mapping.text_column, "body");
        assert_eq!(mapping.title_column.as_deref(), Some("headline"));
        assert_eq!(mapping.rating_column.as_deref(), Some("stars"));

        let config = mapping.enrichment_config();
        assert_eq!(config.topic_labels.as_deref(), Some("price,quality"));
    }

    #[test]
    fn test_text_column_alone_is_enough() {
        let metadata = metadata_with(r#"{"full_review_text": "body"}"#);
        let mapping = ColumnMapping::from_metadata(&metadata).unwrap();
        assert_eq!(mapping.mapped_columns(), vec!["body"]);
        assert!(mapping.title_column.is_none());
    }

    #[test]
    fn test_missing_mapping_key_rejected() {
        let err = ColumnMapping::from_metadata(&HashMap::new()).unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = ColumnMapping::from_metadata(&metadata_with("{not json")).unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
    }

    #[test]
    fn test_missing_text_column_rejected() {
        let err = ColumnMapping::from_metadata(&metadata_with(r#"{"title": "headline"}"#))
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));

        let err =
            ColumnMapping::from_metadata(&metadata_with(r#"{"full_review_text": "  "}"#))
                .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
    }

    #[test]
    fn test_header_validation() {
        let mapping = ColumnMapping {
            rating_column: Some("stars".to_string()),
            ..ColumnMapping::new("body")
        };
        let good = csv::StringRecord::from(vec!["body", "stars", "extra"]);
        assert!(mapping.validate_against_header(&good).is_ok());

        let bad = csv::StringRecord::from(vec!["body", "extra"]);
        let err = mapping.validate_against_header(&bad).unwrap_err();
        assert!(err.to_string().contains("stars"));
    }
}
