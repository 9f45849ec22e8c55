//! Job submission interface.
//!
//! A job is one preprocessing run submitted under a generated name. The
//! [`JobRunner`] trait is the seam between the workflow and whatever
//! executes runs; [`LocalJobRunner`] runs them on background threads.
//! The transformation modules never depend on this module.

mod local;

pub use local::LocalJobRunner;

use crate::config::PreprocessorConfig;
use crate::error::{PreprocessingError, Result};
use crate::types::{OutputPaths, RunSummary};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// Platform job name rule: alphanumerics and single or repeated hyphens,
// starting with an alphanumeric, at most 63 characters.
static JOB_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9](-*[a-zA-Z0-9]){0,62}$").expect("Invalid regex: job name")
});

/// Check a base or full job name against the naming rule.
pub fn validate_job_name(name: &str) -> Result<()> {
    if JOB_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(PreprocessingError::InvalidJobName(name.to_string()))
    }
}

/// Build a job name as `<base>-<UTC timestamp>-<sequence>`.
pub fn job_name(base: &str, created_at: DateTime<Utc>, sequence: u64) -> String {
    format!(
        "{}-{}-{}",
        base,
        created_at.format("%Y-%m-%d-%H-%M-%S"),
        sequence
    )
}

// ============================================================================
// Job Types
// ============================================================================

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// A run to submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub base_job_name: String,
    pub config: PreprocessorConfig,
}

impl JobSpec {
    pub fn new(base_job_name: impl Into<String>, config: PreprocessorConfig) -> Self {
        Self {
            base_job_name: base_job_name.into(),
            config,
        }
    }
}

/// Reference to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_name: String,
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_name)
    }
}

/// Listing entry for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_name: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl JobSummary {
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            job_name: self.job_name.clone(),
        }
    }
}

/// Criteria for [`JobRunner::list_jobs`]. Empty criteria match every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub name_contains: Option<String>,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, job: &JobSummary) -> bool {
        let name_ok = self
            .name_contains
            .as_deref()
            .is_none_or(|fragment| job.job_name.contains(fragment));
        let status_ok = self.status.is_none_or(|status| job.status == status);
        name_ok && status_ok
    }
}

/// Artifacts of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutputs {
    pub job_name: String,
    pub outputs: OutputPaths,
    pub summary: RunSummary,
}

// ============================================================================
// Runner Trait
// ============================================================================

/// Executes preprocessing jobs.
///
/// Implementations must be `Send + Sync` so a runner can be shared between
/// the thread that submits and the threads that poll.
pub trait JobRunner: Send + Sync {
    /// Start a run and return its handle without waiting for it.
    fn submit(&self, spec: JobSpec) -> Result<JobHandle>;

    fn status(&self, handle: &JobHandle) -> Result<JobStatus>;

    /// Block until the job reaches a terminal status.
    fn wait(&self, handle: &JobHandle) -> Result<JobStatus>;

    /// Request cancellation. A job that already finished keeps its status.
    fn stop(&self, handle: &JobHandle) -> Result<()>;

    /// Output locations and summary of a completed job.
    fn fetch_outputs(&self, handle: &JobHandle) -> Result<JobOutputs>;

    /// Jobs matching `filter`, newest first.
    fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobSummary>>;
}

/// Newest completed job whose name contains `base_job_name`.
///
/// # Errors
///
/// Returns `JobNotFound` when no completed job matches.
pub fn latest_completed_job<R>(runner: &R, base_job_name: &str) -> Result<JobSummary>
where
    R: JobRunner + ?Sized,
{
    let filter = JobFilter::default()
        .name_contains(base_job_name)
        .status(JobStatus::Completed);

    runner
        .list_jobs(&filter)?
        .into_iter()
        .next()
        .ok_or_else(|| PreprocessingError::JobNotFound(base_job_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_job_name() {
        assert!(validate_job_name("maintenance-prep").is_ok());
        assert!(validate_job_name("a").is_ok());
        assert!(validate_job_name("a--b").is_ok());
        assert!(validate_job_name(&"x".repeat(63)).is_ok());

        let too_long = "x".repeat(64);
        for bad in ["", "-prep", "prep-", "prep_job", "prep job", too_long.as_str()] {
            let err = validate_job_name(bad).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_JOB_NAME", "{:?}", bad);
        }
    }

    #[test]
    fn test_job_name_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let name = job_name("prep", at, 12);
        assert_eq!(name, "prep-2026-03-04-05-06-07-12");
        assert!(validate_job_name(&name).is_ok());
    }

    #[test]
    fn test_filter_matches() {
        let job = JobSummary {
            job_name: "prep-2026-01-01-00-00-00-1".to_string(),
            status: JobStatus::Completed,
            created_at: Utc::now(),
            ended_at: None,
            failure_reason: None,
        };

        assert!(JobFilter::default().matches(&job));
        assert!(JobFilter::default().name_contains("prep").matches(&job));
        assert!(!JobFilter::default().name_contains("train").matches(&job));
        assert!(!JobFilter::default().status(JobStatus::Failed).matches(&job));
    }

    #[test]
    fn test_status_display_and_terminal() {
        assert_eq!(JobStatus::InProgress.to_string(), "InProgress");
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
    }
}
