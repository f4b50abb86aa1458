//! # Enrichment Pipeline
//!
//! Per-batch execution: the fixed three-stage enrichment chain, the runner
//! that drives it and reports completion, and the dispatch seam to the
//! at-least-once substrate that delivers batch executions.
//!
//! ## Failure blast radii
//!
//! - one record's inference failure → a sentinel value in that record's
//!   derived column, neighbors unaffected
//! - a stage-level failure → the whole batch execution aborts with no
//!   artifact and no counter increment, and the substrate retries it
//! - exhausted retries → the execution is dead-lettered (logged); the job's
//!   counter simply never reaches the total

pub mod dispatcher;
pub mod runner;
pub mod stages;

pub use dispatcher::{BatchDispatcher, DispatchError, LocalDispatcher, RetryPolicy};
pub use runner::{BatchPipelineRunner, BatchRunOutcome, PipelineError};
pub use stages::{AspectStage, EnrichmentStage, SentimentStage, StageError, TopicStage};
