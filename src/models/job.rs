//! # Job Record and Status State Machine
//!
//! A job tracks one enrichment run over one uploaded dataset. Its identity is
//! the content hash of the uploaded bytes, which is what makes intake
//! idempotent: the same bytes always resolve to the same job row.
//!
//! ## Status lifecycle
//!
//! ```text
//! IN_PROGRESS ──> STITCHING ──> COMPLETED
//!      │              ├───────> STITCHING_FAILED
//!      │              └───────> FAILED_NO_BATCHES_COMPLETED
//!      └────────> SPLITTER_FAILED
//! ```
//!
//! `PROCESSING_COMPLETE` is a projection computed at read time (stored status
//! `IN_PROGRESS` with all batches counted); it is never persisted, so a crash
//! between the last counter increment and a status poll cannot strand a job
//! in a state no writer owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status definitions, serialized in wire form (`IN_PROGRESS`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Batches are being processed (initial stored state)
    InProgress,
    /// All batches counted; derived at read time, never stored
    ProcessingComplete,
    /// The aggregator claimed the job and is merging artifacts
    Stitching,
    /// Final artifacts written, intermediates cleaned up
    Completed,
    /// The aggregator failed after claiming the job
    StitchingFailed,
    /// Finalize ran but no batch artifact ever landed
    FailedNoBatchesCompleted,
    /// Intake failed after the job id was known
    SplitterFailed,
}

impl JobStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::StitchingFailed
                | Self::FailedNoBatchesCompleted
                | Self::SplitterFailed
        )
    }

    /// Check if this is a failure state
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::StitchingFailed | Self::FailedNoBatchesCompleted | Self::SplitterFailed
        )
    }

    /// Check whether the store may persist this status.
    ///
    /// `PROCESSING_COMPLETE` exists only as a read-time projection.
    pub fn is_storable(&self) -> bool {
        !matches!(self, Self::ProcessingComplete)
    }

    /// Check whether a stored-status transition is legal.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        matches!(
            (self, target),
            (Self::InProgress, Self::Stitching)
                | (Self::InProgress, Self::SplitterFailed)
                | (Self::Stitching, Self::Completed)
                | (Self::Stitching, Self::StitchingFailed)
                | (Self::Stitching, Self::FailedNoBatchesCompleted)
        )
    }

    /// Stored statuses allowed as the source of a transition into `target`.
    ///
    /// Drives the guarded single-statement UPDATEs in the postgres backend.
    pub fn valid_sources(target: JobStatus) -> Vec<JobStatus> {
        [
            Self::InProgress,
            Self::Stitching,
            Self::Completed,
            Self::StitchingFailed,
            Self::FailedNoBatchesCompleted,
            Self::SplitterFailed,
        ]
        .into_iter()
        .filter(|source| source.can_transition_to(target))
        .collect()
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::InProgress
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::ProcessingComplete => write!(f, "PROCESSING_COMPLETE"),
            Self::Stitching => write!(f, "STITCHING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::StitchingFailed => write!(f, "STITCHING_FAILED"),
            Self::FailedNoBatchesCompleted => write!(f, "FAILED_NO_BATCHES_COMPLETED"),
            Self::SplitterFailed => write!(f, "SPLITTER_FAILED"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PROCESSING_COMPLETE" => Ok(Self::ProcessingComplete),
            "STITCHING" => Ok(Self::Stitching),
            "COMPLETED" => Ok(Self::Completed),
            "STITCHING_FAILED" => Ok(Self::StitchingFailed),
            "FAILED_NO_BATCHES_COMPLETED" => Ok(Self::FailedNoBatchesCompleted),
            "SPLITTER_FAILED" => Ok(Self::SplitterFailed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

/// Fields supplied when registering a job at intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub job_id: String,
    pub total_batches: u32,
    pub source_correlation_key: String,
}

/// One enrichment job as stored by a [`crate::store::JobStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Content hash of the uploaded dataset (lowercase hex SHA-256)
    pub job_id: String,
    /// Stored status; see the module docs for the projection rules
    pub status: JobStatus,
    pub total_batches: u32,
    pub processed_batches: u32,
    /// Reverse-lookup key derived from the upload location
    pub source_correlation_key: String,
    /// Diagnostic message for failure states
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a freshly registered job from intake fields.
    pub fn from_new(new_job: NewJob) -> Self {
        let now = Utc::now();
        Self {
            job_id: new_job.job_id,
            status: JobStatus::InProgress,
            total_batches: new_job.total_batches,
            processed_batches: 0,
            source_correlation_key: new_job.source_correlation_key,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The status observers should see: `PROCESSING_COMPLETE` when every
    /// batch has been counted but no stitch has claimed the job yet.
    pub fn effective_status(&self) -> JobStatus {
        if self.status == JobStatus::InProgress
            && self.total_batches > 0
            && self.processed_batches >= self.total_batches
        {
            JobStatus::ProcessingComplete
        } else {
            self.status
        }
    }

    /// Percentage of batches counted, rounded to two decimal places.
    /// Zero-batch jobs report 0.0 rather than dividing by zero.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_batches == 0 {
            return 0.0;
        }
        let ratio = f64::from(self.processed_batches) / f64::from(self.total_batches);
        (ratio * 100.0 * 100.0).round() / 100.0
    }
}

/// Read-model returned by the status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgressView {
    pub job_id: String,
    pub status: JobStatus,
    pub total_batches: u32,
    pub processed_batches: u32,
    pub progress_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&Job> for JobProgressView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.effective_status(),
            total_batches: job.total_batches,
            processed_batches: job.processed_batches,
            progress_percentage: job.progress_percentage(),
            error_message: job.error_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn job_with_progress(total: u32, processed: u32) -> Job {
        let mut job = Job::from_new(NewJob {
            job_id: "a".repeat(64),
            total_batches: total,
            source_correlation_key: "bronze/uploads/demo/".to_string(),
        });
        job.processed_batches = processed;
        job
    }

    #[test]
    fn test_status_display_round_trip() {
        let statuses = [
            JobStatus::InProgress,
            JobStatus::ProcessingComplete,
            JobStatus::Stitching,
            JobStatus::Completed,
            JobStatus::StitchingFailed,
            JobStatus::FailedNoBatchesCompleted,
            JobStatus::SplitterFailed,
        ];
        for status in statuses {
            let parsed = JobStatus::from_str(&status.to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(JobStatus::from_str("NOT_A_STATUS").is_err());
    }

    #[test]
    fn test_serde_wire_form() {
        let json = serde_json::to_string(&JobStatus::FailedNoBatchesCompleted).unwrap();
        assert_eq!(json, "\"FAILED_NO_BATCHES_COMPLETED\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::StitchingFailed.is_terminal());
        assert!(JobStatus::FailedNoBatchesCompleted.is_terminal());
        assert!(JobStatus::SplitterFailed.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(!JobStatus::Stitching.is_terminal());
    }

    #[test]
    fn test_transition_guard() {
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Stitching));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::SplitterFailed));
        assert!(JobStatus::Stitching.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Stitching.can_transition_to(JobStatus::StitchingFailed));
        assert!(JobStatus::Stitching.can_transition_to(JobStatus::FailedNoBatchesCompleted));

        // Terminal states accept nothing
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Stitching));
        // Stitching cannot be claimed twice
        assert!(!JobStatus::Stitching.can_transition_to(JobStatus::Stitching));
        // The projection is never a transition target
        assert!(!JobStatus::InProgress.can_transition_to(JobStatus::ProcessingComplete));
    }

    #[test]
    fn test_valid_sources_for_stitching() {
        assert_eq!(
            JobStatus::valid_sources(JobStatus::Stitching),
            vec![JobStatus::InProgress]
        );
    }

    #[test]
    fn test_projection_requires_all_batches_counted() {
        assert_eq!(
            job_with_progress(3, 2).effective_status(),
            JobStatus::InProgress
        );
        assert_eq!(
            job_with_progress(3, 3).effective_status(),
            JobStatus::ProcessingComplete
        );
    }

    #[test]
    fn test_projection_never_fires_for_zero_batches() {
        assert_eq!(
            job_with_progress(0, 0).effective_status(),
            JobStatus::InProgress
        );
    }

    #[test]
    fn test_projection_only_from_in_progress() {
        let mut job = job_with_progress(2, 2);
        job.status = JobStatus::Stitching;
        assert_eq!(job.effective_status(), JobStatus::Stitching);
    }

    #[test]
    fn test_progress_percentage_rounding() {
        assert_eq!(job_with_progress(3, 1).progress_percentage(), 33.33);
        assert_eq!(job_with_progress(3, 2).progress_percentage(), 66.67);
        assert_eq!(job_with_progress(4, 4).progress_percentage(), 100.0);
        assert_eq!(job_with_progress(0, 0).progress_percentage(), 0.0);
    }

    #[test]
    fn test_progress_view_reports_projection() {
        let view = JobProgressView::from(&job_with_progress(2, 2));
        assert_eq!(view.status, JobStatus::ProcessingComplete);
        assert_eq!(view.progress_percentage, 100.0);
        assert!(view.error_message.is_none());
    }
}
