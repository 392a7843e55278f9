//! ASR vendor evaluation
//!
//! This crate runs audio test cases through one or more speech recognition
//! vendors and scores each transcript against its ground truth with
//! character and word error rates.
//!
//! # Features
//!
//! - Levenshtein-based CER/WER with an explicit policy for empty references
//! - Test case x vendor evaluation with per-pair failure isolation
//! - Recognizers resolved by vendor kind through a registry
//! - Results persisted through pluggable sinks (memory, JSON Lines)
//! - Job lifecycle tracking and per-vendor summaries
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use asr_eval::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = Arc::new(load_catalog_from_file("catalog.json").unwrap());
//!     let sink = Arc::new(MemorySink::new());
//!
//!     let runner = EvaluationRunner::new(
//!         catalog.clone(),
//!         catalog.clone(),
//!         Arc::new(RecognizerRegistry::with_builtin()),
//!         sink.clone(),
//!         RunnerConfig::default(),
//!     );
//!
//!     let job = JobSpec::new(1, catalog.test_case_ids(), catalog.vendor_ids());
//!     let report = runner.run(&job, &CancellationToken::new()).await.unwrap();
//!     println!("{} results", report.results_persisted);
//! }
//! ```

pub mod cases;
pub mod config;
pub mod metrics;
pub mod recognizers;
pub mod reporting;
pub mod results;
pub mod runner;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::cases::{
        load_catalog_from_directory, load_catalog_from_file, Catalog, TestCaseLookup,
        TestCaseRef, VendorDescriptor, VendorKind, VendorLookup,
    };
    pub use crate::config::Config;
    pub use crate::metrics::{compute_cer, compute_wer, edit_distance, ErrorRate, RateStatus};
    pub use crate::recognizers::{
        RecognitionError, RecognitionRequest, Recognizer, RecognizerRegistry, RecognizerResolver,
        Transcript,
    };
    pub use crate::reporting::{print_console_report, JobSummary, VendorSummary};
    pub use crate::results::{
        EvaluationResult, FanoutSink, JsonLinesSink, MemorySink, RecognitionOutcome, ResultSink,
    };
    pub use crate::runner::{
        run_job, CancellationToken, EvaluationJob, EvaluationRunner, JobSpec, JobStatus,
        RunError, RunReport, RunnerConfig,
    };
}
