//! Evaluation result records and where they are persisted

pub mod sink;

pub use sink::{load_results, FanoutSink, JsonLinesSink, MemorySink, PersistenceError, ResultSink};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cases::{JobId, TestCaseId, VendorId};
use crate::recognizers::{RecognitionError, Transcript};

/// What a single recognizer call produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    /// `None` when the call failed; `Some("")` means no speech detected
    #[serde(rename = "recognized_text")]
    pub hypothesis: Option<String>,
    /// Vendor payload, stored verbatim; `null` when there was none
    #[serde(rename = "raw_vendor_response", default)]
    pub raw_payload: serde_json::Value,
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl RecognitionOutcome {
    pub fn success(transcript: Transcript, latency_ms: u64) -> Self {
        Self {
            hypothesis: Some(transcript.text),
            raw_payload: transcript.raw_payload,
            error: None,
            latency_ms,
        }
    }

    pub fn failure(error: &RecognitionError, latency_ms: u64) -> Self {
        Self {
            hypothesis: None,
            raw_payload: error.raw_payload(),
            error: Some(error.to_string()),
            latency_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One row per (job, test case, vendor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub job_id: JobId,
    pub test_case_id: TestCaseId,
    pub vendor_id: VendorId,
    #[serde(flatten)]
    pub outcome: RecognitionOutcome,
    /// Unset when there is no ground truth, recognition failed, or the
    /// reference was degenerate. Never read an unset metric as 0.0.
    pub cer: Option<f64>,
    pub wer: Option<f64>,
    /// Sentence error rate; not computed
    pub ser: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn new(
        job_id: JobId,
        test_case_id: TestCaseId,
        vendor_id: VendorId,
        outcome: RecognitionOutcome,
    ) -> Self {
        Self {
            job_id,
            test_case_id,
            vendor_id,
            outcome,
            cer: None,
            wer: None,
            ser: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> (JobId, TestCaseId, VendorId) {
        (self.job_id, self.test_case_id, self.vendor_id)
    }

    pub fn has_metrics(&self) -> bool {
        self.cer.is_some() || self.wer.is_some()
    }
}
