//! Result sinks

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

use super::EvaluationResult;
use crate::cases::JobId;

/// Error types for result persistence
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Destination for evaluation results
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, result: &EvaluationResult) -> Result<(), PersistenceError>;
}

/// Keeps results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<EvaluationResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far, in arrival order
    pub fn results(&self) -> Vec<EvaluationResult> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(&self, result: &EvaluationResult) -> Result<(), PersistenceError> {
        self.results
            .lock()
            .map_err(|_| PersistenceError::Rejected("memory sink lock poisoned".to_string()))?
            .push(result.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a file
pub struct JsonLinesSink {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it and its parent directory
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultSink for JsonLinesSink {
    async fn persist(&self, result: &EvaluationResult) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Read back the results of one job from a JSON Lines file.
///
/// Rows of other jobs are ignored. Lines that do not parse, such as a
/// partial last line left by an interrupted run, are logged and skipped.
pub fn load_results(
    path: impl AsRef<Path>,
    job_id: JobId,
) -> Result<Vec<EvaluationResult>, PersistenceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let mut results = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EvaluationResult>(line) {
            Ok(result) if result.job_id == job_id => results.push(result),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Skipping line {} of {:?}: {}", index + 1, path, e);
            }
        }
    }
    Ok(results)
}

/// Forwards every result to each inner sink.
///
/// All sinks are attempted; the first failure is returned.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ResultSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ResultSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ResultSink for FanoutSink {
    async fn persist(&self, result: &EvaluationResult) -> Result<(), PersistenceError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.persist(result).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizers::Transcript;
    use crate::results::RecognitionOutcome;

    fn result(test_case_id: u64) -> EvaluationResult {
        let outcome = RecognitionOutcome::success(Transcript::new("text", serde_json::Value::Null), 1);
        let mut result = EvaluationResult::new(1, test_case_id, 9, outcome);
        result.cer = Some(0.25);
        result
    }

    struct Refusing;

    #[async_trait]
    impl ResultSink for Refusing {
        async fn persist(&self, _result: &EvaluationResult) -> Result<(), PersistenceError> {
            Err(PersistenceError::Rejected("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        for id in [3, 1, 2] {
            sink.persist(&result(id)).await.unwrap();
        }
        let ids: Vec<_> = sink.results().iter().map(|r| r.test_case_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.jsonl");

        let sink = JsonLinesSink::create(&path).await.unwrap();
        sink.persist(&result(1)).await.unwrap();
        sink.persist(&result(2)).await.unwrap();
        drop(sink);

        let sink = JsonLinesSink::create(&path).await.unwrap();
        sink.persist(&result(3)).await.unwrap();
        assert_eq!(sink.path(), path.as_path());

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<EvaluationResult> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].test_case_id, 3);
        assert_eq!(rows[0].cer, Some(0.25));
        assert_eq!(rows[0].wer, None);
    }

    #[tokio::test]
    async fn test_load_results_for_one_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        let sink = JsonLinesSink::create(&path).await.unwrap();
        sink.persist(&result(1)).await.unwrap();
        let mut other_job = result(2);
        other_job.job_id = 2;
        sink.persist(&other_job).await.unwrap();
        sink.persist(&result(3)).await.unwrap();
        drop(sink);

        // Interrupted write
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"job_id\": 1, \"test_ca");
        std::fs::write(&path, content).unwrap();

        let rows = load_results(&path, 1).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.test_case_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(load_results(&path, 2).unwrap().len(), 1);
        assert!(load_results(&path, 9).unwrap().is_empty());
        assert!(matches!(
            load_results(dir.path().join("missing.jsonl"), 1),
            Err(PersistenceError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let memory = Arc::new(MemorySink::new());
        let sinks: Vec<Arc<dyn ResultSink>> = vec![Arc::new(Refusing), memory.clone()];
        let fanout = FanoutSink::new(sinks);

        let err = fanout.persist(&result(1)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected(_)));
        assert_eq!(memory.len(), 1);
    }
}
