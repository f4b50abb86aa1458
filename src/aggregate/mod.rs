//! # Aggregation
//!
//! Fan-in for completed jobs: the [`Stitcher`] merges a job's intermediate
//! batch artifacts into the final report, runs corpus-level topic discovery
//! over the merged output, and retires the intermediates.
//!
//! The stitch is single-flight per job. Claiming the job is a guarded
//! status transition into `STITCHING`, so a second caller loses the claim
//! with an illegal-transition error instead of racing the first.

pub mod stitcher;

pub use stitcher::{StitchError, StitchOutcome, Stitcher};
