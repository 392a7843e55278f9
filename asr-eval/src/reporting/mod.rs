//! Results reporting

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cases::{JobId, VendorId};
use crate::results::EvaluationResult;
use crate::runner::{EvaluationJob, JobStatus, RunReport};

/// Per-vendor aggregate over one job's results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub vendor_id: VendorId,
    pub results: usize,
    pub recognition_failures: usize,
    /// Results that carried a CER
    pub scored: usize,
    /// Means over results whose metric is set; unset metrics are never
    /// counted as zero
    pub mean_cer: Option<f64>,
    pub mean_wer: Option<f64>,
    pub mean_latency_ms: Option<f64>,
    pub max_latency_ms: Option<u64>,
}

impl VendorSummary {
    fn from_results<'a>(
        vendor_id: VendorId,
        results: impl Iterator<Item = &'a EvaluationResult>,
    ) -> Self {
        let results: Vec<_> = results.collect();
        let cers: Vec<f64> = results.iter().filter_map(|r| r.cer).collect();
        let wers: Vec<f64> = results.iter().filter_map(|r| r.wer).collect();
        let latencies: Vec<u64> = results.iter().map(|r| r.outcome.latency_ms).collect();

        Self {
            vendor_id,
            results: results.len(),
            recognition_failures: results.iter().filter(|r| !r.outcome.is_success()).count(),
            scored: cers.len(),
            mean_cer: mean(&cers),
            mean_wer: mean(&wers),
            mean_latency_ms: mean(&latencies.iter().map(|&l| l as f64).collect::<Vec<_>>()),
            max_latency_ms: latencies.iter().copied().max(),
        }
    }
}

/// One summary per vendor, in order of first appearance
pub fn summarize_vendors(results: &[EvaluationResult]) -> Vec<VendorSummary> {
    let mut by_vendor: IndexMap<VendorId, Vec<&EvaluationResult>> = IndexMap::new();
    for result in results {
        by_vendor.entry(result.vendor_id).or_default().push(result);
    }
    by_vendor
        .into_iter()
        .map(|(vendor_id, rows)| VendorSummary::from_results(vendor_id, rows.into_iter()))
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// JSON summary export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub run_id: String,
    pub job_id: JobId,
    pub job_name: Option<String>,
    pub status: JobStatus,
    pub timestamp: String,
    pub total_pairs: usize,
    pub results_persisted: usize,
    pub recognition_failures: usize,
    pub persistence_failures: usize,
    pub skipped_test_cases: usize,
    pub skipped_pairs: usize,
    /// Vendors in job order
    pub vendors: Vec<VendorSummary>,
    pub detailed_results_file: Option<String>,
}

impl JobSummary {
    pub fn from_report(
        run_id: impl Into<String>,
        job: &EvaluationJob,
        report: &RunReport,
        detailed_file: Option<String>,
    ) -> Self {
        let mut by_vendor: IndexMap<VendorId, Vec<&EvaluationResult>> = job
            .vendor_ids
            .iter()
            .map(|&id| (id, Vec::new()))
            .collect();
        for result in &report.results {
            by_vendor.entry(result.vendor_id).or_default().push(result);
        }

        let vendors = by_vendor
            .into_iter()
            .map(|(vendor_id, results)| VendorSummary::from_results(vendor_id, results.into_iter()))
            .collect();

        Self {
            run_id: run_id.into(),
            job_id: job.id,
            job_name: job.name.clone(),
            status: job.status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_pairs: report.total_pairs,
            results_persisted: report.results_persisted,
            recognition_failures: report.recognition_failures,
            persistence_failures: report.persistence_failures,
            skipped_test_cases: report.skipped_test_cases.len(),
            skipped_pairs: report.skipped_pairs.len(),
            vendors,
            detailed_results_file: detailed_file,
        }
    }

    /// Vendors with a mean CER, best (lowest) first
    pub fn ranking(&self) -> Vec<&VendorSummary> {
        let mut ranked: Vec<_> = self.vendors.iter().filter(|v| v.mean_cer.is_some()).collect();
        ranked.sort_by(|a, b| {
            a.mean_cer
                .partial_cmp(&b.mean_cer)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

fn fmt_rate(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

/// Generate a console report
pub fn print_console_report(summary: &JobSummary) {
    println!("\n=== ASR Evaluation Results ===\n");
    match &summary.job_name {
        Some(name) => println!("Job: {} ({})", summary.job_id, name),
        None => println!("Job: {}", summary.job_id),
    }
    println!("Status: {}", summary.status);
    println!(
        "Pairs: {} total, {} results, {} recognition failures",
        summary.total_pairs, summary.results_persisted, summary.recognition_failures
    );
    if summary.skipped_test_cases > 0 || summary.skipped_pairs > 0 {
        println!(
            "Skipped: {} test cases, {} pairs",
            summary.skipped_test_cases, summary.skipped_pairs
        );
    }
    if summary.persistence_failures > 0 {
        println!("Results not saved: {}", summary.persistence_failures);
    }

    println!("\nVendors:");
    println!("{:-<70}", "");
    println!(
        "  {:>8}  {:>7}  {:>8}  {:>8}  {:>8}  {:>12}",
        "vendor", "results", "failures", "CER", "WER", "latency(ms)"
    );
    for vendor in &summary.vendors {
        println!(
            "  {:>8}  {:>7}  {:>8}  {:>8}  {:>8}  {:>12}",
            vendor.vendor_id,
            vendor.results,
            vendor.recognition_failures,
            fmt_rate(vendor.mean_cer),
            fmt_rate(vendor.mean_wer),
            vendor
                .mean_latency_ms
                .map(|l| format!("{:.0}", l))
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    let ranking = summary.ranking();
    if !ranking.is_empty() {
        println!("\nRanking by CER:");
        println!("{:-<70}", "");
        for (i, vendor) in ranking.iter().enumerate() {
            println!("  {}. vendor {} - CER {}", i + 1, vendor.vendor_id, fmt_rate(vendor.mean_cer));
        }
    }

    println!("\n{:=<70}", "");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizers::{RecognitionError, Transcript};
    use crate::results::RecognitionOutcome;

    fn row(vendor_id: VendorId, cer: Option<f64>, latency: u64) -> EvaluationResult {
        let outcome = RecognitionOutcome::success(Transcript::new("x", serde_json::Value::Null), latency);
        let mut result = EvaluationResult::new(1, 1, vendor_id, outcome);
        result.cer = cer;
        result.wer = cer;
        result
    }

    fn report(results: Vec<EvaluationResult>) -> RunReport {
        RunReport {
            job_id: 1,
            total_pairs: 4,
            results_persisted: results.len(),
            results,
            ..Default::default()
        }
    }

    #[test]
    fn test_unset_metrics_are_not_averaged_as_zero() {
        let job = EvaluationJob::new(1, vec![1, 2], vec![10, 20]);
        let failed = EvaluationResult::new(
            1,
            2,
            10,
            RecognitionOutcome::failure(&RecognitionError::vendor("boom"), 40),
        );
        let summary = JobSummary::from_report(
            "run",
            &job,
            &report(vec![row(10, Some(0.5), 20), failed, row(20, None, 10)]),
            None,
        );

        let a = &summary.vendors[0];
        assert_eq!(a.vendor_id, 10);
        assert_eq!(a.results, 2);
        assert_eq!(a.recognition_failures, 1);
        assert_eq!(a.scored, 1);
        assert_eq!(a.mean_cer, Some(0.5));
        assert_eq!(a.mean_latency_ms, Some(30.0));
        assert_eq!(a.max_latency_ms, Some(40));

        let b = &summary.vendors[1];
        assert_eq!(b.mean_cer, None);
        assert_eq!(b.scored, 0);
    }

    #[test]
    fn test_vendor_without_results_is_listed() {
        let job = EvaluationJob::new(1, vec![1], vec![10, 20]);
        let summary = JobSummary::from_report("run", &job, &report(vec![row(20, Some(0.1), 5)]), None);
        let ids: Vec<_> = summary.vendors.iter().map(|v| v.vendor_id).collect();
        assert_eq!(ids, vec![10, 20]);
        assert_eq!(summary.vendors[0].results, 0);
        assert_eq!(summary.vendors[0].mean_latency_ms, None);
    }

    #[test]
    fn test_summarize_loaded_rows() {
        let rows = vec![row(20, Some(0.2), 10), row(10, Some(0.4), 30), row(20, Some(0.4), 20)];
        let summaries = summarize_vendors(&rows);
        let ids: Vec<_> = summaries.iter().map(|v| v.vendor_id).collect();
        assert_eq!(ids, vec![20, 10]);
        assert_eq!(summaries[0].results, 2);
        assert!((summaries[0].mean_cer.unwrap() - 0.3).abs() < 1e-9);
        assert_eq!(summaries[0].max_latency_ms, Some(20));
    }

    #[test]
    fn test_ranking_lowest_cer_first() {
        let job = EvaluationJob::new(1, vec![1], vec![10, 20, 30]);
        let summary = JobSummary::from_report(
            "run",
            &job,
            &report(vec![row(10, Some(0.4), 1), row(20, Some(0.1), 1), row(30, None, 1)]),
            None,
        );
        let ranked: Vec<_> = summary.ranking().iter().map(|v| v.vendor_id).collect();
        assert_eq!(ranked, vec![20, 10]);
    }

    #[test]
    fn test_write_summary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let job = EvaluationJob::new(7, vec![1], vec![10]).with_name("smoke");
        let summary = JobSummary::from_report(
            "run-1",
            &job,
            &report(vec![row(10, Some(0.2), 3)]),
            Some("results.jsonl".to_string()),
        );
        summary.write_to_file(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["job_id"], 7);
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["vendors"][0]["mean_cer"], 0.2);
    }
}
