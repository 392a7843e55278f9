//! Transcript scoring: edit distance, CER and WER

pub mod edit_distance;
pub mod error_rate;

pub use edit_distance::edit_distance;
pub use error_rate::{
    compute_cer, compute_wer, latency_ms, DegenerateInput, ErrorRate, RateStatus, TokenUnit,
};
