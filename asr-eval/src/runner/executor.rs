//! Evaluation runner: drives one job's test case x vendor matrix

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::cancel::CancellationToken;
use crate::cases::{
    JobId, ParamBag, TestCaseId, TestCaseLookup, TestCaseRef, VendorId, VendorLookup,
};
use crate::metrics::{compute_cer, compute_wer, latency_ms, TokenUnit};
use crate::recognizers::{
    RecognitionError, RecognitionRequest, RecognitionResult, Recognizer, RecognizerResolver,
    Transcript,
};
use crate::results::{EvaluationResult, RecognitionOutcome, ResultSink};

/// Configuration for the runner
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Vendor calls in flight per test case; 1 is strictly sequential
    pub max_concurrent_calls: usize,
    /// Recognizer call timeout; `None` leaves timing out to the recognizer
    pub recognizer_timeout_ms: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 1,
            recognizer_timeout_ms: None,
        }
    }
}

/// The matrix to evaluate
#[derive(Debug, Clone, Default)]
pub struct JobSpec {
    pub job_id: JobId,
    pub test_case_ids: Vec<TestCaseId>,
    pub vendor_ids: Vec<VendorId>,
    /// Passed to every recognizer call
    pub parameters: ParamBag,
}

impl JobSpec {
    pub fn new(job_id: JobId, test_case_ids: Vec<TestCaseId>, vendor_ids: Vec<VendorId>) -> Self {
        Self {
            job_id,
            test_case_ids,
            vendor_ids,
            parameters: ParamBag::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: ParamBag) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn total_pairs(&self) -> usize {
        self.test_case_ids.len() * self.vendor_ids.len()
    }
}

/// A test case whose lookup failed; none of its pairs produced a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTestCase {
    pub test_case_id: TestCaseId,
    pub reason: String,
}

/// A single pair that produced no row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub test_case_id: TestCaseId,
    pub vendor_id: VendorId,
    pub reason: String,
}

/// What a run did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub job_id: JobId,
    pub total_pairs: usize,
    pub results_persisted: usize,
    pub recognition_failures: usize,
    pub persistence_failures: usize,
    pub skipped_test_cases: Vec<SkippedTestCase>,
    pub skipped_pairs: Vec<SkippedPair>,
    /// Persisted results in matrix order
    pub results: Vec<EvaluationResult>,
}

impl RunReport {
    fn new(job: &JobSpec) -> Self {
        Self {
            job_id: job.job_id,
            total_pairs: job.total_pairs(),
            ..Default::default()
        }
    }
}

/// Errors that stop a run before the matrix is fully attempted
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Run cancelled after {} persisted results", .report.results_persisted)]
    Cancelled { report: Box<RunReport> },
}

enum PairOutcome {
    Evaluated(EvaluationResult),
    Skipped(SkippedPair),
}

/// Runs a job's matrix against injected collaborators.
///
/// Every failure below the run itself is isolated to its pair or test case:
/// lookups that fail skip, recognizer errors are recorded on the result,
/// and sink errors are logged while the loop continues.
pub struct EvaluationRunner {
    config: RunnerConfig,
    test_cases: Arc<dyn TestCaseLookup>,
    worker: PairWorker,
    sink: Arc<dyn ResultSink>,
}

/// Everything a spawned pair evaluation needs
#[derive(Clone)]
struct PairWorker {
    vendors: Arc<dyn VendorLookup>,
    recognizers: Arc<dyn RecognizerResolver>,
    progress: Arc<dyn ProgressCallback>,
    recognizer_timeout_ms: Option<u64>,
}

impl EvaluationRunner {
    pub fn new(
        test_cases: Arc<dyn TestCaseLookup>,
        vendors: Arc<dyn VendorLookup>,
        recognizers: Arc<dyn RecognizerResolver>,
        sink: Arc<dyn ResultSink>,
        config: RunnerConfig,
    ) -> Self {
        let worker = PairWorker {
            vendors,
            recognizers,
            progress: Arc::new(NoOpProgress),
            recognizer_timeout_ms: config.recognizer_timeout_ms,
        };
        Self {
            config,
            test_cases,
            worker,
            sink,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.worker.progress = progress;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Evaluate every (test case, vendor) pair of the job.
    ///
    /// Returns `Ok` once the matrix has been fully attempted, however many
    /// pairs failed. Results reach the sink in test case order, then vendor
    /// order, even when vendor calls overlap.
    pub async fn run(
        &self,
        job: &JobSpec,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        tracing::info!(
            "Starting evaluation for job {}: test cases {:?}, vendors {:?}",
            job.job_id,
            job.test_case_ids,
            job.vendor_ids
        );

        let mut report = RunReport::new(job);
        let mut completed = 0usize;
        let total = job.total_pairs();
        let permits = self.config.max_concurrent_calls.max(1);

        for &test_case_id in &job.test_case_ids {
            if cancel.is_cancelled() {
                return Err(Self::cancelled(report));
            }

            let test_case = match self.test_cases.test_case(test_case_id).await {
                Ok(test_case) => Arc::new(test_case),
                Err(e) => {
                    tracing::warn!(
                        "Error fetching test case {}: {}. Skipping it for job {}",
                        test_case_id,
                        e,
                        job.job_id
                    );
                    report.skipped_test_cases.push(SkippedTestCase {
                        test_case_id,
                        reason: e.to_string(),
                    });
                    completed += job.vendor_ids.len();
                    self.worker.progress.on_progress(completed, total);
                    continue;
                }
            };
            tracing::info!("Processing test case {} ({})", test_case.name, test_case.id);

            let semaphore = Arc::new(Semaphore::new(permits));
            let mut handles = Vec::with_capacity(job.vendor_ids.len());
            let mut cancelled = false;

            // Permits are taken here, in vendor order, so a single permit
            // means each call starts only after the previous one finished
            for &vendor_id in &job.vendor_ids {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        cancelled = true;
                        break;
                    }
                };
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }

                let worker = self.worker.clone();
                let test_case = test_case.clone();
                let parameters = job.parameters.clone();
                let job_id = job.job_id;

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    worker.evaluate_pair(job_id, &test_case, vendor_id, parameters).await
                });
                handles.push((vendor_id, handle));
            }

            for (vendor_id, handle) in handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(
                            "Evaluation of test case {} with vendor {} panicked: {}",
                            test_case_id,
                            vendor_id,
                            e
                        );
                        PairOutcome::Skipped(SkippedPair {
                            test_case_id,
                            vendor_id,
                            reason: format!("pair evaluation panicked: {}", e),
                        })
                    }
                };

                match outcome {
                    PairOutcome::Evaluated(result) => {
                        let success = result.outcome.is_success();
                        if !success {
                            report.recognition_failures += 1;
                        }
                        self.persist(result, &mut report).await;
                        self.worker.progress.on_pair_complete(test_case_id, vendor_id, success);
                    }
                    PairOutcome::Skipped(skipped) => {
                        report.skipped_pairs.push(skipped);
                        self.worker.progress.on_pair_complete(test_case_id, vendor_id, false);
                    }
                }

                completed += 1;
                self.worker.progress.on_progress(completed, total);
            }

            if cancelled {
                return Err(Self::cancelled(report));
            }
        }

        tracing::info!(
            "Completed evaluation for job {}: {} results, {} recognition failures, {} skipped pairs",
            job.job_id,
            report.results_persisted,
            report.recognition_failures,
            report.skipped_pairs.len()
        );
        Ok(report)
    }

    async fn persist(&self, result: EvaluationResult, report: &mut RunReport) {
        match self.sink.persist(&result).await {
            Ok(()) => {
                tracing::debug!(
                    "Saved result for test case {}, vendor {}, job {}",
                    result.test_case_id,
                    result.vendor_id,
                    result.job_id
                );
                report.results_persisted += 1;
                report.results.push(result);
            }
            Err(e) => {
                tracing::error!(
                    "Error saving result for test case {}, vendor {}, job {}: {}",
                    result.test_case_id,
                    result.vendor_id,
                    result.job_id,
                    e
                );
                report.persistence_failures += 1;
            }
        }
    }

    fn cancelled(report: RunReport) -> RunError {
        tracing::warn!(
            "Evaluation for job {} cancelled with {} results persisted",
            report.job_id,
            report.results_persisted
        );
        RunError::Cancelled {
            report: Box::new(report),
        }
    }
}

impl PairWorker {
    async fn evaluate_pair(
        &self,
        job_id: JobId,
        test_case: &TestCaseRef,
        vendor_id: VendorId,
        parameters: ParamBag,
    ) -> PairOutcome {
        let skip = |reason: String| {
            PairOutcome::Skipped(SkippedPair {
                test_case_id: test_case.id,
                vendor_id,
                reason,
            })
        };

        let vendor = match self.vendors.vendor(vendor_id).await {
            Ok(vendor) => vendor,
            Err(e) => {
                tracing::warn!(
                    "Error fetching vendor {}: {}. Skipping it for test case {}, job {}",
                    vendor_id,
                    e,
                    test_case.id,
                    job_id
                );
                return skip(e.to_string());
            }
        };

        let recognizer = match self.recognizers.resolve(&vendor) {
            Ok(recognizer) => recognizer,
            Err(e) => {
                tracing::warn!(
                    "{}. Skipping vendor {} for test case {}, job {}",
                    e,
                    vendor_id,
                    test_case.id,
                    job_id
                );
                return skip(e.to_string());
            }
        };

        tracing::debug!(
            "Using vendor {} ({}) via {} for test case {}",
            vendor.name,
            vendor.id,
            recognizer.name(),
            test_case.id
        );
        self.progress.on_pair_start(test_case.id, vendor_id);

        let request = RecognitionRequest::new(
            test_case.audio_ref.clone(),
            test_case.language(),
            vendor,
        )
        .with_params(parameters);

        let start = Instant::now();
        let recognized = self.call_recognizer(recognizer.as_ref(), &request).await;
        let latency = latency_ms(start.elapsed());

        let outcome = match recognized {
            Ok(transcript) => RecognitionOutcome::success(transcript, latency),
            Err(e) => {
                tracing::warn!(
                    "Recognition failed for test case {}, vendor {}: {}",
                    test_case.id,
                    vendor_id,
                    e
                );
                RecognitionOutcome::failure(&e, latency)
            }
        };

        let mut result = EvaluationResult::new(job_id, test_case.id, vendor_id, outcome);
        apply_metrics(&mut result, test_case);
        PairOutcome::Evaluated(result)
    }

    async fn call_recognizer(
        &self,
        recognizer: &dyn Recognizer,
        request: &RecognitionRequest,
    ) -> RecognitionResult<Transcript> {
        match self.recognizer_timeout_ms {
            Some(timeout_ms) => {
                let timeout = Duration::from_millis(timeout_ms);
                match tokio::time::timeout(timeout, recognizer.recognize(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(RecognitionError::Timeout { timeout_ms }),
                }
            }
            None => recognizer.recognize(request).await,
        }
    }
}

/// Fill CER/WER when there is ground truth and a hypothesis.
///
/// Metrics stay unset otherwise, and a degenerate rate is left unset
/// rather than stored.
fn apply_metrics(result: &mut EvaluationResult, test_case: &TestCaseRef) {
    let Some(reference) = test_case.ground_truth() else {
        tracing::debug!("No ground truth for test case {}; metrics not calculated", test_case.id);
        return;
    };
    let Some(hypothesis) = result.outcome.hypothesis.as_deref() else {
        return;
    };

    let rates = [compute_cer(reference, hypothesis), compute_wer(reference, hypothesis)];
    for rate in rates {
        let unit = rate.unit;
        let score = match rate.into_result() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    "Metric unset for test case {}, vendor {}: {}",
                    result.test_case_id,
                    result.vendor_id,
                    e
                );
                None
            }
        };
        match unit {
            TokenUnit::Character => result.cer = score,
            TokenUnit::Word => result.wer = score,
        }
    }
}

/// Progress callback for tracking execution
pub trait ProgressCallback: Send + Sync {
    fn on_pair_start(&self, test_case_id: TestCaseId, vendor_id: VendorId);
    fn on_pair_complete(&self, test_case_id: TestCaseId, vendor_id: VendorId, success: bool);
    fn on_progress(&self, completed: usize, total: usize);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_pair_start(&self, _test_case_id: TestCaseId, _vendor_id: VendorId) {}
    fn on_pair_complete(&self, _test_case_id: TestCaseId, _vendor_id: VendorId, _success: bool) {}
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Console progress callback
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_pair_start(&self, test_case_id: TestCaseId, vendor_id: VendorId) {
        println!("  Starting test case {} on vendor {}...", test_case_id, vendor_id);
    }

    fn on_pair_complete(&self, test_case_id: TestCaseId, vendor_id: VendorId, success: bool) {
        let status = if success { "OK" } else { "FAILED" };
        println!("  {} test case {} on vendor {}", status, test_case_id, vendor_id);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        println!("Progress: {}/{} pairs attempted", completed, total);
    }
}
