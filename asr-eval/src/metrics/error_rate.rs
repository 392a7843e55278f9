//! Character and word error rates

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::edit_distance::edit_distance;

/// Tokenization granularity of an error rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUnit {
    /// Unicode scalar values
    Character,
    /// Whitespace-delimited words
    Word,
}

impl TokenUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenUnit::Character => "character",
            TokenUnit::Word => "word",
        }
    }
}

impl std::fmt::Display for TokenUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an error rate is a usable score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateStatus {
    Ok,
    /// Empty reference against a non-empty hypothesis; the value is
    /// informational only.
    Degenerate,
}

/// Reference has no tokens while the hypothesis does
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("reference is empty, cannot normalize {unit} error rate (hypothesis: {hypothesis_len} {unit}s)")]
pub struct DegenerateInput {
    pub unit: TokenUnit,
    pub hypothesis_len: usize,
}

/// Normalized edit distance between a reference and a hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRate {
    pub unit: TokenUnit,
    /// `distance / reference_len`; not clamped, insertions can push it above 1.0
    pub value: f64,
    pub status: RateStatus,
    pub distance: usize,
    pub reference_len: usize,
    pub hypothesis_len: usize,
}

impl ErrorRate {
    fn from_tokens<T: PartialEq>(unit: TokenUnit, reference: &[T], hypothesis: &[T]) -> Self {
        let reference_len = reference.len();
        let hypothesis_len = hypothesis.len();
        let distance = edit_distance(reference, hypothesis);

        let (value, status) = match (reference_len, hypothesis_len) {
            (0, 0) => (0.0, RateStatus::Ok),
            (0, _) => (1.0, RateStatus::Degenerate),
            (n, _) => (distance as f64 / n as f64, RateStatus::Ok),
        };

        Self {
            unit,
            value,
            status,
            distance,
            reference_len,
            hypothesis_len,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RateStatus::Ok
    }

    /// The value if it is a real score, `None` when degenerate
    pub fn score(&self) -> Option<f64> {
        match self.status {
            RateStatus::Ok => Some(self.value),
            RateStatus::Degenerate => None,
        }
    }

    /// Surface the degenerate case as an error
    pub fn into_result(self) -> Result<f64, DegenerateInput> {
        match self.status {
            RateStatus::Ok => Ok(self.value),
            RateStatus::Degenerate => Err(DegenerateInput {
                unit: self.unit,
                hypothesis_len: self.hypothesis_len,
            }),
        }
    }
}

/// Character Error Rate over Unicode code points
pub fn compute_cer(reference: &str, hypothesis: &str) -> ErrorRate {
    let reference: Vec<char> = reference.chars().collect();
    let hypothesis: Vec<char> = hypothesis.chars().collect();
    ErrorRate::from_tokens(TokenUnit::Character, &reference, &hypothesis)
}

/// Word Error Rate over whitespace-delimited words
pub fn compute_wer(reference: &str, hypothesis: &str) -> ErrorRate {
    let reference: Vec<&str> = reference.split_whitespace().collect();
    let hypothesis: Vec<&str> = hypothesis.split_whitespace().collect();
    ErrorRate::from_tokens(TokenUnit::Word, &reference, &hypothesis)
}

/// Latency is reported as measured, in whole milliseconds
pub fn latency_ms(elapsed: Duration) -> u64 {
    elapsed.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_is_zero() {
        for s in ["hello", "the cat sat", "你好世界", " padded  text "] {
            assert_eq!(compute_cer(s, s).score(), Some(0.0));
            assert_eq!(compute_wer(s, s).score(), Some(0.0));
        }
    }

    #[test]
    fn test_scenario_one_substitution() {
        let wer = compute_wer("the cat sat", "the hat sat");
        assert!(wer.is_ok());
        assert_eq!(wer.distance, 1);
        assert_eq!(wer.reference_len, 3);
        assert!(approx(wer.value, 1.0 / 3.0));

        let cer = compute_cer("the cat sat", "the hat sat");
        assert_eq!(cer.reference_len, 11);
        assert!(approx(cer.value, 1.0 / 11.0));
    }

    #[test]
    fn test_normalization_uses_reference_length() {
        let forward = compute_cer("hello", "hello world");
        let backward = compute_cer("hello world", "hello");
        assert_eq!(forward.distance, backward.distance);
        assert!(approx(forward.value, 6.0 / 5.0));
        assert!(approx(backward.value, 6.0 / 11.0));
        assert_ne!(forward.value, backward.value);
    }

    #[test]
    fn test_empty_reference() {
        let both_empty = compute_cer("", "");
        assert_eq!(both_empty.status, RateStatus::Ok);
        assert_eq!(both_empty.value, 0.0);

        let degenerate = compute_cer("", "x");
        assert_eq!(degenerate.status, RateStatus::Degenerate);
        assert_eq!(degenerate.value, 1.0);
        assert_eq!(degenerate.score(), None);

        let err = degenerate.into_result().unwrap_err();
        assert_eq!(err.unit, TokenUnit::Character);
        assert_eq!(err.hypothesis_len, 1);
        assert!(compute_wer("", "").into_result().is_ok());
    }

    #[test]
    fn test_whitespace_only_reference_is_degenerate_for_words() {
        let wer = compute_wer("   \t ", "something");
        assert_eq!(wer.status, RateStatus::Degenerate);

        // Whitespace is still characters
        let cer = compute_cer("  ", "ab");
        assert!(cer.is_ok());
        assert!(approx(cer.value, 1.0));
    }

    #[test]
    fn test_value_is_unbounded() {
        let wer = compute_wer("a", "a a a a a a");
        assert!(approx(wer.value, 5.0));
        assert!(wer.value > 1.0);
    }

    #[test]
    fn test_empty_hypothesis_is_full_deletion() {
        let wer = compute_wer("one two three", "");
        assert!(wer.is_ok());
        assert!(approx(wer.value, 1.0));
    }

    #[test]
    fn test_code_points_not_bytes() {
        let cer = compute_cer("héllo", "hello");
        assert_eq!(cer.reference_len, 5);
        assert!(approx(cer.value, 0.2));
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(compute_wer("a  b\tc", "a b c").score(), Some(0.0));
        assert_eq!(compute_wer("a b c\n", "  a b   c").score(), Some(0.0));
    }

    #[test]
    fn test_repeat_calls_are_bit_identical() {
        let first = compute_cer("recognition", "wreck a nice beach");
        for _ in 0..10 {
            let again = compute_cer("recognition", "wreck a nice beach");
            assert_eq!(first.value.to_bits(), again.value.to_bits());
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_latency_passthrough() {
        assert_eq!(latency_ms(Duration::from_millis(1234)), 1234);
        assert_eq!(latency_ms(Duration::from_micros(999)), 0);
    }
}
