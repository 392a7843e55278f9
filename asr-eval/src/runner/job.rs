//! Evaluation job lifecycle

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::cancel::CancellationToken;
use super::executor::{EvaluationRunner, JobSpec, RunError, RunReport};
use crate::cases::{JobId, ParamBag, TestCaseId, VendorId};
use crate::results::PersistenceError;

/// Status of an evaluation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    /// The matrix was fully attempted, whatever happened to single pairs
    Completed,
    /// The job could not be run to the end
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted evaluation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationJob {
    pub id: JobId,
    pub name: Option<String>,
    pub status: JobStatus,
    pub test_case_ids: Vec<TestCaseId>,
    pub vendor_ids: Vec<VendorId>,
    #[serde(default)]
    pub parameters: ParamBag,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EvaluationJob {
    pub fn new(id: JobId, test_case_ids: Vec<TestCaseId>, vendor_ids: Vec<VendorId>) -> Self {
        Self {
            id,
            name: None,
            status: JobStatus::Pending,
            test_case_ids,
            vendor_ids,
            parameters: ParamBag::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ParamBag) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn spec(&self) -> JobSpec {
        JobSpec::new(self.id, self.test_case_ids.clone(), self.vendor_ids.clone())
            .with_parameters(self.parameters.clone())
    }

    fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

/// Where job rows are kept
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save(&self, job: &EvaluationJob) -> Result<(), PersistenceError>;
}

/// Keeps every saved revision of every job
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    history: Mutex<Vec<EvaluationJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses saved so far for a job, oldest first
    pub fn status_history(&self, id: JobId) -> Vec<JobStatus> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|job| job.id == id)
            .map(|job| job.status)
            .collect()
    }

    pub fn latest(&self, id: JobId) -> Option<EvaluationJob> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .rev()
            .find(|job| job.id == id)
            .cloned()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, job: &EvaluationJob) -> Result<(), PersistenceError> {
        self.history
            .lock()
            .map_err(|_| PersistenceError::Rejected("job store lock poisoned".to_string()))?
            .push(job.clone());
        Ok(())
    }
}

/// Overwrites a JSON file with the job's current state
#[derive(Debug, Clone)]
pub struct JsonFileJobStore {
    path: PathBuf,
}

impl JsonFileJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn save(&self, job: &EvaluationJob) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(job)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// Errors from running a job
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {id} is {status}, only PENDING jobs can run")]
    NotPending { id: JobId, status: JobStatus },

    #[error("Failed to record job state: {0}")]
    Store(#[from] PersistenceError),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Run a pending job to a terminal status.
///
/// The job is saved as RUNNING before the matrix starts and again once it
/// reaches COMPLETED or CANCELLED. If the RUNNING state cannot be recorded
/// the job is marked FAILED without evaluating anything. A failure to save
/// the terminal state is logged; the run's own outcome is still returned.
pub async fn run_job(
    runner: &EvaluationRunner,
    store: &dyn JobStore,
    job: &mut EvaluationJob,
    cancel: &CancellationToken,
) -> Result<RunReport, JobError> {
    if job.status != JobStatus::Pending {
        return Err(JobError::NotPending {
            id: job.id,
            status: job.status,
        });
    }

    job.mark_running();
    if let Err(e) = store.save(job).await {
        tracing::error!("Failed to mark job {} RUNNING: {}. Marking it FAILED", job.id, e);
        job.finish(JobStatus::Failed);
        if let Err(e) = store.save(job).await {
            tracing::error!("Failed to record FAILED status for job {}: {}", job.id, e);
        }
        return Err(JobError::Store(e));
    }
    tracing::info!("Job {} is RUNNING", job.id);

    let outcome = runner.run(&job.spec(), cancel).await;
    let status = match &outcome {
        Ok(_) => JobStatus::Completed,
        Err(RunError::Cancelled { .. }) => JobStatus::Cancelled,
    };
    job.finish(status);
    tracing::info!("Job {} finished as {}", job.id, status);

    if let Err(e) = store.save(job).await {
        tracing::error!("Failed to record {} status for job {}: {}", status, job.id, e);
    }

    outcome.map_err(JobError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = EvaluationJob::new(1, vec![1, 2], vec![3]).with_name("nightly");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert_eq!(job.name.as_deref(), Some("nightly"));

        let spec = job.spec();
        assert_eq!(spec.job_id, 1);
        assert_eq!(spec.total_pairs(), 2);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(serde_json::to_string(&JobStatus::Completed).unwrap(), "\"COMPLETED\"");
        assert_eq!(JobStatus::Cancelled.to_string(), "CANCELLED");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[tokio::test]
    async fn test_json_file_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::new(dir.path().join("run").join("job.json"));

        let mut job = EvaluationJob::new(5, vec![1], vec![2]);
        store.save(&job).await.unwrap();
        job.mark_running();
        store.save(&job).await.unwrap();

        let saved: EvaluationJob =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(saved.status, JobStatus::Running);
        assert!(saved.started_at.is_some());
    }
}
