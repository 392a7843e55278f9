//! Evaluation runner and job lifecycle

pub mod cancel;
pub mod executor;
pub mod job;

pub use cancel::CancellationToken;
pub use executor::{
    ConsoleProgress, EvaluationRunner, JobSpec, NoOpProgress, ProgressCallback, RunError,
    RunReport, RunnerConfig, SkippedPair, SkippedTestCase,
};
pub use job::{run_job, EvaluationJob, JobError, JobStatus, JobStore, JsonFileJobStore, MemoryJobStore};
