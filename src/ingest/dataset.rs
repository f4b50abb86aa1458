//! # Dataset Parsing and Partitioning
//!
//! CSV bytes in, cleaned [`ReviewRecord`]s out, then fixed-size batches.
//!
//! Cleaning per record:
//! - title prepended to the body when a title column is mapped, blanks
//!   treated as empty
//! - [`sanitize_text`] applied to the combined text, then edge whitespace
//!   trimmed
//! - ratings parsed as `f64`; unparseable cells become `None`, never errors

use csv::ReaderBuilder;

use super::mapping::ColumnMapping;
use super::sanitize::sanitize_text;
use super::IntakeError;
use crate::models::{RecordBatch, ReviewRecord};

/// Parse the uploaded CSV into cleaned review records, in dataset order.
pub fn parse_records(
    content: &[u8],
    mapping: &ColumnMapping,
) -> Result<Vec<ReviewRecord>, IntakeError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(content);
    let headers = reader.headers()?.clone();
    mapping.validate_against_header(&headers)?;

    let column_index = |name: &str| headers.iter().position(|header| header == name);
    let text_index = column_index(&mapping.text_column).ok_or_else(|| {
        IntakeError::Validation(format!(
            "mapped column '{}' not found in dataset header",
            mapping.text_column
        ))
    })?;
    let title_index = mapping.title_column.as_deref().and_then(column_index);
    let rating_index = mapping.rating_column.as_deref().and_then(column_index);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let body = row.get(text_index).unwrap_or_default();
        let title = title_index
            .and_then(|index| row.get(index))
            .unwrap_or_default();

        let combined = if title.is_empty() {
            body.to_string()
        } else {
            format!("{title} {body}")
        };
        let text = sanitize_text(&combined).trim().to_string();

        let rating = rating_index
            .and_then(|index| row.get(index))
            .and_then(|cell| cell.trim().parse::<f64>().ok());

        records.push(ReviewRecord::new(text, rating));
    }
    Ok(records)
}

/// Partition records into fixed-size batches; the final batch may be short.
pub fn partition(records: Vec<ReviewRecord>, batch_size: usize) -> Vec<RecordBatch> {
    let batch_size = batch_size.max(1);
    records
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| RecordBatch::new(index as u32, chunk.to_vec()))
        .collect()
}
