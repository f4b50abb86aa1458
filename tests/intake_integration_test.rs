//! Intake integration tests: content-hash identity, duplicate short-circuit,
//! fan-out counts, and the diagnosable `SPLITTER_FAILED` record left behind
//! when an upload violates the intake contract.

mod common;

use std::sync::Arc;

use reviewflow_core::ingest::{DatasetUpload, IntakeError, IntakeOutcome, Splitter};
use reviewflow_core::models::JobStatus;
use reviewflow_core::pipeline::BatchDispatcher;
use reviewflow_core::store::{JobStore, MemoryJobStore};

use common::{empty_csv, mapping_metadata, review_csv, upload_under, RecordingDispatcher};

struct IntakeHarness {
    store: Arc<MemoryJobStore>,
    dispatcher: Arc<RecordingDispatcher>,
    splitter: Splitter,
}

fn harness(batch_size: usize) -> IntakeHarness {
    let store = Arc::new(MemoryJobStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let splitter = Splitter::new(
        Arc::clone(&store) as Arc<dyn JobStore>,
        Arc::clone(&dispatcher) as Arc<dyn BatchDispatcher>,
        batch_size,
    );
    IntakeHarness {
        store,
        dispatcher,
        splitter,
    }
}

#[tokio::test]
async fn test_upload_registers_job_and_fans_out() {
    let harness = harness(10);
    let upload = upload_under("ord-1", review_csv(25));
    let expected_job_id = upload.job_id();

    let outcome = harness.splitter.ingest(upload).await.unwrap();

    assert_eq!(
        outcome,
        IntakeOutcome::Started {
            job_id: expected_job_id.clone(),
            total_batches: 3,
        }
    );
    assert_eq!(harness.dispatcher.count(), 3);

    let job = harness
        .store
        .get(&expected_job_id)
        .await
        .unwrap()
        .expect("job registered");
    assert_eq!(job.status, JobStatus::InProgress);
    assert_eq!(job.total_batches, 3);
    assert_eq!(job.processed_batches, 0);
    assert_eq!(
        job.source_correlation_key,
        "reviewflow-bronze/uploads/ord-1/"
    );
}

#[tokio::test]
async fn test_duplicate_content_short_circuits() {
    let harness = harness(10);
    let content = review_csv(25);

    let first = harness
        .splitter
        .ingest(upload_under("ord-1", content.clone()))
        .await
        .unwrap();

    // Same bytes under a different upload prefix: same hash, no new fan-out
    let second = harness
        .splitter
        .ingest(upload_under("ord-1-retry", content))
        .await
        .unwrap();

    assert_eq!(
        second,
        IntakeOutcome::Duplicate {
            job_id: first.job_id().to_string(),
        }
    );
    assert_eq!(harness.dispatcher.count(), 3);

    let job = harness
        .store
        .get(first.job_id())
        .await
        .unwrap()
        .expect("job registered");
    assert_eq!(job.total_batches, 3);
    // The original correlation key survives the re-upload
    assert_eq!(
        job.source_correlation_key,
        "reviewflow-bronze/uploads/ord-1/"
    );
}

#[tokio::test]
async fn test_missing_mapping_leaves_splitter_failed_record() {
    let harness = harness(10);
    let upload = DatasetUpload::new(
        "reviewflow-bronze",
        "uploads/ord-2/reviews.csv",
        std::collections::HashMap::new(),
        review_csv(5),
    );
    let job_id = upload.job_id();

    let error = harness.splitter.ingest(upload).await.unwrap_err();
    assert!(matches!(error, IntakeError::Validation(_)));
    assert_eq!(harness.dispatcher.count(), 0);

    let job = harness
        .store
        .get(&job_id)
        .await
        .unwrap()
        .expect("failure record upserted");
    assert_eq!(job.status, JobStatus::SplitterFailed);
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("missing the column mapping"));
}

#[tokio::test]
async fn test_unmapped_column_leaves_splitter_failed_record() {
    let harness = harness(10);
    let mut metadata = mapping_metadata();
    metadata.insert(
        "mapping".to_string(),
        r#"{"full_review_text": "no_such_column"}"#.to_string(),
    );
    let upload = DatasetUpload::new(
        "reviewflow-bronze",
        "uploads/ord-3/reviews.csv",
        metadata,
        review_csv(5),
    );
    let job_id = upload.job_id();

    let error = harness.splitter.ingest(upload).await.unwrap_err();
    assert!(error.to_string().contains("no_such_column"));

    let job = harness
        .store
        .get(&job_id)
        .await
        .unwrap()
        .expect("failure record upserted");
    assert_eq!(job.status, JobStatus::SplitterFailed);
}

#[tokio::test]
async fn test_header_only_csv_registers_zero_batch_job() {
    let harness = harness(10);
    let upload = upload_under("ord-4", empty_csv());
    let job_id = upload.job_id();

    let outcome = harness.splitter.ingest(upload).await.unwrap();
    assert_eq!(
        outcome,
        IntakeOutcome::Started {
            job_id: job_id.clone(),
            total_batches: 0,
        }
    );
    assert_eq!(harness.dispatcher.count(), 0);

    // Zero-batch jobs never project PROCESSING_COMPLETE
    let job = harness.store.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.effective_status(), JobStatus::InProgress);
}
