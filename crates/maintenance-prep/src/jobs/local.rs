//! In-process job runner: one worker thread per submitted job.

use super::{
    JobFilter, JobHandle, JobOutputs, JobRunner, JobSpec, JobStatus, JobSummary, job_name,
    validate_job_name,
};
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::pipeline::{CancellationToken, PreprocessingOutcome, Preprocessor};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct JobEntry {
    summary: JobSummary,
    sequence: u64,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
    outcome: Option<PreprocessingOutcome>,
}

impl JobEntry {
    fn finish(&mut self, result: Result<PreprocessingOutcome>) {
        self.summary.ended_at = Some(Utc::now());
        // The worker has exited, or is exiting, once its result is in.
        self.worker = None;
        match result {
            Ok(outcome) => {
                self.summary.status = JobStatus::Completed;
                self.outcome = Some(outcome);
            }
            Err(e) if e.is_cancelled() => {
                self.summary.status = JobStatus::Stopped;
            }
            Err(e) => {
                self.summary.status = JobStatus::Failed;
                self.summary.failure_reason = Some(e.to_string());
            }
        }
        info!(
            "Job {} finished with status {}",
            self.summary.job_name, self.summary.status
        );
    }
}

/// Runs each job's [`Preprocessor::run`] on its own thread.
///
/// The job table lives only as long as the runner. Finished jobs keep
/// their summary and outputs until the runner is dropped, but not their
/// worker thread handle.
#[derive(Default)]
pub struct LocalJobRunner {
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
    sequence: AtomicU64,
}

static_assertions::assert_impl_all!(LocalJobRunner: Send, Sync);

impl LocalJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<T>(&self, handle: &JobHandle, f: impl FnOnce(&mut JobEntry) -> T) -> Result<T> {
        let mut jobs = self.jobs.lock();
        let entry = jobs
            .get_mut(&handle.job_name)
            .ok_or_else(|| PreprocessingError::JobNotFound(handle.job_name.clone()))?;
        Ok(f(entry))
    }
}

impl JobRunner for LocalJobRunner {
    fn submit(&self, spec: JobSpec) -> Result<JobHandle> {
        validate_job_name(&spec.base_job_name)?;

        let token = CancellationToken::new();
        let preprocessor = Preprocessor::builder()
            .config(spec.config)
            .cancellation_token(token.clone())
            .build()?;

        let created_at = Utc::now();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let name = job_name(&spec.base_job_name, created_at, sequence);
        validate_job_name(&name)?;

        // The worker reports into the table, so the entry exists before it starts.
        let mut jobs = self.jobs.lock();
        jobs.insert(
            name.clone(),
            JobEntry {
                summary: JobSummary {
                    job_name: name.clone(),
                    status: JobStatus::InProgress,
                    created_at,
                    ended_at: None,
                    failure_reason: None,
                },
                sequence,
                token,
                worker: None,
                outcome: None,
            },
        );

        let table = Arc::clone(&self.jobs);
        let worker_name = name.clone();
        let spawned = thread::Builder::new()
            .name(format!("job-{}", sequence))
            .spawn(move || {
                let result = preprocessor.run();
                if let Some(entry) = table.lock().get_mut(&worker_name) {
                    entry.finish(result);
                }
            });

        match spawned {
            Ok(worker) => {
                if let Some(entry) = jobs.get_mut(&name) {
                    entry.worker = Some(worker);
                }
            }
            Err(e) => {
                jobs.remove(&name);
                return Err(e).context(format!("Failed to start job {}", name));
            }
        }

        info!("Submitted job {}", name);
        Ok(JobHandle { job_name: name })
    }

    fn status(&self, handle: &JobHandle) -> Result<JobStatus> {
        self.with_entry(handle, |entry| entry.summary.status)
    }

    fn wait(&self, handle: &JobHandle) -> Result<JobStatus> {
        let worker = self.with_entry(handle, |entry| entry.worker.take())?;

        match worker {
            Some(worker) => {
                if worker.join().is_err() {
                    warn!("Worker for job {} panicked", handle);
                    self.with_entry(handle, |entry| {
                        entry.finish(Err(PreprocessingError::Internal(
                            "job worker panicked".to_string(),
                        )))
                    })?;
                }
            }
            // Another caller is joining the worker.
            None => {
                while !self.status(handle)?.is_terminal() {
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }

        self.status(handle)
    }

    fn stop(&self, handle: &JobHandle) -> Result<()> {
        self.with_entry(handle, |entry| {
            if !entry.summary.status.is_terminal() {
                info!("Stopping job {}", handle);
                entry.token.cancel();
            }
        })
    }

    fn fetch_outputs(&self, handle: &JobHandle) -> Result<JobOutputs> {
        self.with_entry(handle, |entry| match &entry.outcome {
            Some(outcome) if entry.summary.status == JobStatus::Completed => Ok(JobOutputs {
                job_name: entry.summary.job_name.clone(),
                outputs: outcome.summary.outputs.clone(),
                summary: outcome.summary.clone(),
            }),
            _ => Err(PreprocessingError::JobNotComplete {
                job: entry.summary.job_name.clone(),
                status: entry.summary.status.to_string(),
            }),
        })?
    }

    fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobSummary>> {
        let jobs = self.jobs.lock();
        let mut matching: Vec<(&JobSummary, u64)> = jobs
            .values()
            .filter(|entry| filter.matches(&entry.summary))
            .map(|entry| (&entry.summary, entry.sequence))
            .collect();

        matching.sort_by(|a, b| (b.0.created_at, b.1).cmp(&(a.0.created_at, a.1)));
        Ok(matching.into_iter().map(|(summary, _)| summary.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputLayout, PreprocessorConfig};
    use crate::jobs::latest_completed_job;
    use std::fs;
    use std::path::Path;

    const INPUT: &str = "\
UDI,Product ID,Type,Air temperature [K],Process temperature [K],Rotational speed [rpm],\
Torque [Nm],Tool wear [min],Machine failure,TWF,HDF,PWF,OSF,RNF
1,M14860,M,298.1,308.6,1551,42.8,0,0,0,0,0,0,0
2,L47181,L,298.2,308.7,1408,46.3,3,0,0,0,0,0,0
3,L47182,L,298.1,308.5,1498,49.4,5,0,0,0,0,0,0
4,L47183,L,298.2,308.6,1433,39.5,7,0,,0,0,0,0
5,H29424,H,298.2,308.7,1408,40.0,9,1,0,1,0,0,0
";

    fn config_in(dir: &Path, run: &str) -> PreprocessorConfig {
        let input = dir.join("raw.csv");
        if !input.exists() {
            fs::write(&input, INPUT).unwrap();
        }
        PreprocessorConfig::builder()
            .input_path(input)
            .outputs(OutputLayout::under(dir.join(run)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_submit_wait_and_fetch_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalJobRunner::new();

        let handle = runner
            .submit(JobSpec::new("prep", config_in(dir.path(), "run1")))
            .unwrap();
        assert!(handle.job_name.starts_with("prep-"));

        assert_eq!(runner.wait(&handle).unwrap(), JobStatus::Completed);
        assert_eq!(runner.status(&handle).unwrap(), JobStatus::Completed);

        let outputs = runner.fetch_outputs(&handle).unwrap();
        assert_eq!(outputs.summary.rows_total, 5);
        assert!(outputs.outputs.train.exists());
        assert!(outputs.outputs.validation.exists());
        assert!(outputs.outputs.state.exists());

        // Stopping a finished job leaves it completed.
        runner.stop(&handle).unwrap();
        assert_eq!(runner.status(&handle).unwrap(), JobStatus::Completed);
    }

    #[test]
    fn test_failed_job_has_no_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalJobRunner::new();
        let config = PreprocessorConfig::builder()
            .input_path(dir.path().join("missing.csv"))
            .outputs(OutputLayout::under(dir.path()))
            .build()
            .unwrap();

        let handle = runner.submit(JobSpec::new("prep", config)).unwrap();
        assert_eq!(runner.wait(&handle).unwrap(), JobStatus::Failed);

        let jobs = runner.list_jobs(&JobFilter::default()).unwrap();
        assert!(jobs[0].failure_reason.is_some());

        let err = runner.fetch_outputs(&handle).unwrap_err();
        assert_eq!(err.error_code(), "JOB_NOT_COMPLETE");
    }

    #[test]
    fn test_finished_job_releases_worker_handle() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalJobRunner::new();

        let handle = runner
            .submit(JobSpec::new("prep", config_in(dir.path(), "run")))
            .unwrap();
        while !runner.status(&handle).unwrap().is_terminal() {
            thread::sleep(POLL_INTERVAL);
        }

        // Nobody called wait, yet the handle is gone and the summary stays.
        assert!(runner.jobs.lock()[&handle.job_name].worker.is_none());
        assert_eq!(runner.wait(&handle).unwrap(), JobStatus::Completed);
        assert_eq!(runner.list_jobs(&JobFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_stopped_job_has_no_outputs() {
        let runner = LocalJobRunner::new();
        let handle = JobHandle {
            job_name: "prep-stopped".to_string(),
        };
        let mut entry = JobEntry {
            summary: JobSummary {
                job_name: handle.job_name.clone(),
                status: JobStatus::InProgress,
                created_at: Utc::now(),
                ended_at: None,
                failure_reason: None,
            },
            sequence: 1,
            token: CancellationToken::new(),
            worker: None,
            outcome: None,
        };
        entry.finish(Err(PreprocessingError::Cancelled.with_context("Transforming rows")));
        runner.jobs.lock().insert(handle.job_name.clone(), entry);

        assert_eq!(runner.status(&handle).unwrap(), JobStatus::Stopped);
        let jobs = runner.list_jobs(&JobFilter::default()).unwrap();
        assert!(jobs[0].failure_reason.is_none());
        assert!(jobs[0].ended_at.is_some());

        let err = runner.fetch_outputs(&handle).unwrap_err();
        assert_eq!(err.error_code(), "JOB_NOT_COMPLETE");
        assert!(err.to_string().contains("Stopped"));

        runner.stop(&handle).unwrap();
        assert_eq!(runner.wait(&handle).unwrap(), JobStatus::Stopped);
    }

    #[test]
    fn test_invalid_base_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalJobRunner::new();

        let err = runner
            .submit(JobSpec::new("bad_name", config_in(dir.path(), "run")))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JOB_NAME");
        assert!(runner.list_jobs(&JobFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_job() {
        let runner = LocalJobRunner::new();
        let handle = JobHandle {
            job_name: "nope".to_string(),
        };
        assert_eq!(runner.status(&handle).unwrap_err().error_code(), "JOB_NOT_FOUND");
        assert_eq!(runner.stop(&handle).unwrap_err().error_code(), "JOB_NOT_FOUND");
    }

    #[test]
    fn test_latest_completed_job() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalJobRunner::new();

        let first = runner
            .submit(JobSpec::new("prep", config_in(dir.path(), "a")))
            .unwrap();
        runner.wait(&first).unwrap();
        let second = runner
            .submit(JobSpec::new("prep", config_in(dir.path(), "b")))
            .unwrap();
        runner.wait(&second).unwrap();
        let other = runner
            .submit(JobSpec::new("other", config_in(dir.path(), "c")))
            .unwrap();
        runner.wait(&other).unwrap();

        let latest = latest_completed_job(&runner, "prep").unwrap();
        assert_eq!(latest.job_name, second.job_name);

        let err = latest_completed_job(&runner, "missing").unwrap_err();
        assert_eq!(err.error_code(), "JOB_NOT_FOUND");
    }
}
