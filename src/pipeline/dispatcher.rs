//! # Batch Dispatch
//!
//! The seam between intake and execution. The splitter hands each batch to
//! a [`BatchDispatcher`] and never waits for enrichment; the dispatcher owns
//! delivery semantics (at-least-once, retries, dead-lettering).
//!
//! [`LocalDispatcher`] is the in-process substrate: every batch becomes a
//! tokio task retried with linear backoff. A queue-backed substrate slots in
//! behind the same trait without touching intake.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::models::BatchExecution;
use crate::pipeline::runner::BatchPipelineRunner;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch rejected: {0}")]
    Rejected(String),
}

/// Hands a batch execution to the substrate for asynchronous processing.
///
/// `Ok` means accepted for delivery, not processed. Substrates must deliver
/// at least once; the runner tolerates redelivery.
#[async_trait]
pub trait BatchDispatcher: Send + Sync {
    async fn dispatch(&self, execution: BatchExecution) -> Result<(), DispatchError>;
}

/// Retry schedule for failed batch executions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// In-process dispatch: one tokio task per batch execution.
pub struct LocalDispatcher {
    runner: Arc<BatchPipelineRunner>,
    retry: RetryPolicy,
    tasks: Mutex<JoinSet<()>>,
}

impl LocalDispatcher {
    pub fn new(runner: Arc<BatchPipelineRunner>, retry: RetryPolicy) -> Self {
        Self {
            runner,
            retry,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Wait for every dispatched execution to finish, including retries.
    /// Task panics are logged and swallowed so one poisoned batch cannot
    /// take the drain down with it.
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(join_error) = result {
                error!(error = %join_error, "Batch task panicked");
            }
        }
    }
}

#[async_trait]
impl BatchDispatcher for LocalDispatcher {
    async fn dispatch(&self, execution: BatchExecution) -> Result<(), DispatchError> {
        let runner = Arc::clone(&self.runner);
        let retry = self.retry;
        self.tasks
            .lock()
            .await
            .spawn(run_with_retry(runner, execution, retry));
        Ok(())
    }
}

async fn run_with_retry(
    runner: Arc<BatchPipelineRunner>,
    execution: BatchExecution,
    retry: RetryPolicy,
) {
    let job_id = execution.job_id.clone();
    let batch_index = execution.batch.batch_index;

    for attempt in 1..=retry.max_attempts {
        match runner.run(execution.clone()).await {
            Ok(outcome) => {
                debug!(
                    job_id = %job_id,
                    batch_index,
                    attempt,
                    processed_batches = outcome.processed_batches,
                    "Batch execution complete"
                );
                return;
            }
            Err(err) => {
                warn!(
                    job_id = %job_id,
                    batch_index,
                    attempt,
                    max_attempts = retry.max_attempts,
                    error = %err,
                    "Batch execution failed"
                );
                if attempt < retry.max_attempts {
                    tokio::time::sleep(retry.backoff * attempt).await;
                }
            }
        }
    }

    error!(
        job_id = %job_id,
        batch_index,
        attempts = retry.max_attempts,
        "Batch execution dead-lettered after exhausting retries"
    );
}
