//! ASR Evaluation CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use asr_eval::{
    cases::{load_catalog_from_directory, load_catalog_from_file, Catalog, ParamBag},
    config::Config,
    metrics::{compute_cer, compute_wer, ErrorRate},
    recognizers::RecognizerRegistry,
    reporting::{print_console_report, summarize_vendors, JobSummary},
    results::{load_results, FanoutSink, JsonLinesSink, ResultSink},
    runner::{
        run_job, CancellationToken, ConsoleProgress, EvaluationJob, EvaluationRunner,
        JobError, JsonFileJobStore, RunError,
    },
};

#[derive(Parser)]
#[command(name = "asr-eval")]
#[command(about = "Evaluate speech recognition vendors against ground-truth transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evaluation job
    Run {
        /// Path to the test case and vendor catalog (file or directory)
        #[arg(long)]
        catalog: PathBuf,

        /// Comma-separated test case ids (default: all in the catalog)
        #[arg(long)]
        cases: Option<String>,

        /// Only test cases in this language (ignored with --cases)
        #[arg(long)]
        language: Option<String>,

        /// Only test cases carrying all of these comma-separated tags (ignored with --cases)
        #[arg(long)]
        tags: Option<String>,

        /// Comma-separated vendor ids (default: all in the catalog)
        #[arg(long)]
        vendors: Option<String>,

        /// Recognition parameters as a JSON object
        #[arg(long)]
        params: Option<String>,

        /// Job id recorded on every result
        #[arg(long, default_value = "1")]
        job_id: u64,

        /// Job name
        #[arg(long)]
        name: Option<String>,

        /// Vendor calls in flight per test case (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-call recognizer timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print per-pair progress
        #[arg(long)]
        progress: bool,
    },

    /// Score one hypothesis against a reference
    Score {
        /// Ground-truth transcript
        #[arg(short, long)]
        reference: String,

        /// Recognized transcript
        #[arg(long)]
        hypothesis: String,
    },

    /// List test cases and vendors in a catalog
    ListCases {
        /// Path to the catalog (file or directory)
        #[arg(long)]
        catalog: PathBuf,

        /// Only test cases in this language
        #[arg(long)]
        language: Option<String>,

        /// Only test cases carrying all of these comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Show the stored results of a job
    Results {
        /// Results file or run directory containing results.jsonl
        #[arg(short, long)]
        input: PathBuf,

        /// Job whose results to show
        #[arg(long, default_value = "1")]
        job_id: u64,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/asr-eval.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("asr_eval=debug,info")
    } else {
        EnvFilter::new("asr_eval=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Run {
            catalog,
            cases,
            language,
            tags,
            vendors,
            params,
            job_id,
            name,
            concurrency,
            timeout_ms,
            output,
            progress,
        } => {
            let options = RunOptions {
                catalog,
                cases,
                language,
                tags: parse_tags(tags.as_deref()),
                vendors,
                params,
                job_id,
                name,
                concurrency,
                timeout_ms,
                output,
                progress,
            };
            run_evaluation(config, options).await?;
        }

        Commands::Score {
            reference,
            hypothesis,
        } => {
            score(&reference, &hypothesis);
        }

        Commands::ListCases {
            catalog,
            language,
            tags,
        } => {
            list_cases(&catalog, language.as_deref(), &parse_tags(tags.as_deref()))?;
        }

        Commands::Results { input, job_id } => {
            show_results(&input, job_id)?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

struct RunOptions {
    catalog: PathBuf,
    cases: Option<String>,
    language: Option<String>,
    tags: Vec<String>,
    vendors: Option<String>,
    params: Option<String>,
    job_id: u64,
    name: Option<String>,
    concurrency: Option<usize>,
    timeout_ms: Option<u64>,
    output: Option<PathBuf>,
    progress: bool,
}

async fn run_evaluation(
    mut config: Config,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let started_at = Utc::now();
    let run_id = started_at.format("%Y%m%d-%H%M%S").to_string();

    println!("=== ASR Evaluation ===");
    println!("Run ID: {}", run_id);
    println!();

    if let Some(concurrency) = options.concurrency {
        config.runner.max_concurrent_calls = concurrency;
    }
    if options.timeout_ms.is_some() {
        config.runner.recognizer_timeout_ms = options.timeout_ms;
    }

    let catalog = Arc::new(load_catalog(&options.catalog)?);
    let test_case_ids = match &options.cases {
        Some(list) => parse_ids(list)?,
        None => catalog
            .test_cases_matching(options.language.as_deref(), &options.tags)
            .map(|case| case.id)
            .collect(),
    };
    let vendor_ids = match &options.vendors {
        Some(list) => parse_ids(list)?,
        None => catalog.vendor_ids(),
    };
    if test_case_ids.is_empty() || vendor_ids.is_empty() {
        eprintln!("Error: Nothing to evaluate (no test cases or no vendors selected)");
        std::process::exit(1);
    }
    let parameters = match &options.params {
        Some(json) => parse_params(json)?,
        None => ParamBag::new(),
    };

    println!("Test cases: {:?}", test_case_ids);
    println!("Vendors:    {:?}", vendor_ids);
    println!();

    let output_dir = options
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.output_dir))
        .join(&run_id);
    std::fs::create_dir_all(&output_dir)?;

    let mut sinks: Vec<Arc<dyn ResultSink>> = Vec::new();
    let results_file = output_dir.join("results.jsonl");
    if config.output.write_results {
        sinks.push(Arc::new(JsonLinesSink::create(&results_file).await?));
    }

    let mut runner = EvaluationRunner::new(
        catalog.clone(),
        catalog.clone(),
        Arc::new(RecognizerRegistry::with_builtin()),
        Arc::new(FanoutSink::new(sinks)),
        config.runner.to_runner_config(),
    );
    if options.progress {
        runner = runner.with_progress(Arc::new(ConsoleProgress));
    }

    let mut job = EvaluationJob::new(options.job_id, test_case_ids, vendor_ids)
        .with_parameters(parameters);
    if let Some(name) = options.name {
        job = job.with_name(name);
    }
    let store = JsonFileJobStore::new(output_dir.join("job.json"));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received; finishing in-flight calls");
            signal_token.cancel();
        }
    });

    println!("Running evaluation...");
    let report = match run_job(&runner, &store, &mut job, &cancel).await {
        Ok(report) => report,
        Err(JobError::Run(RunError::Cancelled { report })) => *report,
        Err(e) => return Err(e.into()),
    };

    let detailed_file = config
        .output
        .write_results
        .then(|| results_file.display().to_string());
    let summary = JobSummary::from_report(&run_id, &job, &report, detailed_file);
    print_console_report(&summary);

    if config.output.write_summary {
        let summary_path = output_dir.join("summary.json");
        summary.write_to_file(&summary_path)?;
        println!("Summary written to: {}", summary_path.display());
    }
    println!("Job state written to: {}", store.path().display());

    Ok(())
}

fn load_catalog(path: &Path) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = if path.is_dir() {
        load_catalog_from_directory(path)?
    } else {
        load_catalog_from_file(path)?
    };
    Ok(catalog)
}

fn parse_ids(list: &str) -> Result<Vec<u64>, Box<dyn std::error::Error>> {
    let mut ids = Vec::new();
    for part in list.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let id = part
            .parse::<u64>()
            .map_err(|e| format!("invalid id '{}': {}", part, e))?;
        ids.push(id);
    }
    Ok(ids)
}

fn parse_params(json: &str) -> Result<ParamBag, Box<dyn std::error::Error>> {
    match serde_json::from_str::<serde_json::Value>(json)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!("--params must be a JSON object, got {}", other).into()),
    }
}

fn score(reference: &str, hypothesis: &str) {
    let print_rate = |label: &str, rate: ErrorRate| match rate.score() {
        Some(value) => println!(
            "{}: {:.4} ({} edits / {} reference tokens)",
            label, value, rate.distance, rate.reference_len
        ),
        None => println!(
            "{}: undefined (empty reference, {} hypothesis tokens)",
            label, rate.hypothesis_len
        ),
    };
    print_rate("CER", compute_cer(reference, hypothesis));
    print_rate("WER", compute_wer(reference, hypothesis));
}

fn parse_tags(list: Option<&str>) -> Vec<String> {
    list.map(|list| {
        list.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn list_cases(
    path: &Path,
    language: Option<&str>,
    tags: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(path)?;

    println!("Test cases:");
    println!("{:-<70}", "");
    for case in catalog.test_cases_matching(language, tags) {
        let truth = if case.ground_truth().is_some() { "yes" } else { "no" };
        println!(
            "  {:>6}  {:<24}  {:<8}  ground truth: {}",
            case.id,
            case.name,
            case.language(),
            truth
        );
    }

    println!("\nVendors:");
    println!("{:-<70}", "");
    for vendor in catalog.vendors() {
        println!("  {:>6}  {:<24}  {}", vendor.id, vendor.name, vendor.kind);
    }

    Ok(())
}

fn show_results(input: &Path, job_id: u64) -> Result<(), Box<dyn std::error::Error>> {
    let path = if input.is_dir() {
        input.join("results.jsonl")
    } else {
        input.to_path_buf()
    };
    let results = load_results(&path, job_id)?;

    if results.is_empty() {
        println!("No results for job {} in {}", job_id, path.display());
        return Ok(());
    }

    println!("Results for job {} ({} rows):", job_id, results.len());
    println!("{:-<70}", "");
    for result in &results {
        let status = match &result.outcome.error {
            Some(e) => format!("error: {}", e),
            None => format!(
                "CER {}  WER {}",
                fmt_rate(result.cer),
                fmt_rate(result.wer)
            ),
        };
        println!(
            "  case {:>6}  vendor {:>6}  {:>6}ms  {}",
            result.test_case_id, result.vendor_id, result.outcome.latency_ms, status
        );
    }

    println!("\nPer vendor:");
    println!("{:-<70}", "");
    for vendor in summarize_vendors(&results) {
        println!(
            "  vendor {:>6}  results {:>4}  failures {:>4}  CER {}  WER {}",
            vendor.vendor_id,
            vendor.results,
            vendor.recognition_failures,
            fmt_rate(vendor.mean_cer),
            fmt_rate(vendor.mean_wer)
        );
    }

    Ok(())
}

fn fmt_rate(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
