//! Recognizer trait definitions for speech-to-text vendors

use async_trait::async_trait;
use std::sync::Arc;

use crate::cases::{ParamBag, VendorDescriptor, VendorKind};

/// Inputs for a single recognition call
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Opaque audio reference from the test case
    pub audio_ref: String,
    pub language_code: String,
    pub params: ParamBag,
    pub vendor: VendorDescriptor,
}

impl RecognitionRequest {
    pub fn new(audio_ref: impl Into<String>, language_code: impl Into<String>, vendor: VendorDescriptor) -> Self {
        Self {
            audio_ref: audio_ref.into(),
            language_code: language_code.into(),
            params: ParamBag::new(),
            vendor,
        }
    }

    pub fn with_params(mut self, params: ParamBag) -> Self {
        self.params = params;
        self
    }
}

/// Text produced by a recognizer plus the vendor's payload, kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// May be empty: no speech detected
    pub text: String,
    pub raw_payload: serde_json::Value,
}

impl Transcript {
    pub fn new(text: impl Into<String>, raw_payload: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            raw_payload,
        }
    }
}

/// Error types for recognition
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognitionError {
    #[error("Vendor error: {message}")]
    Vendor {
        message: String,
        /// Whatever the vendor sent back alongside the failure
        raw_payload: Option<serde_json::Value>,
    },

    #[error("No recognizer registered for vendor {vendor} (kind {kind})")]
    NoAdapter { vendor: String, kind: VendorKind },

    #[error("No transcript recorded for audio {0}")]
    NoTranscript(String),

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid vendor settings: {0}")]
    InvalidSettings(String),
}

impl RecognitionError {
    pub fn vendor(message: impl Into<String>) -> Self {
        RecognitionError::Vendor {
            message: message.into(),
            raw_payload: None,
        }
    }

    /// Payload to keep for audit when the call failed
    pub fn raw_payload(&self) -> serde_json::Value {
        match self {
            RecognitionError::Vendor {
                raw_payload: Some(payload),
                ..
            } => payload.clone(),
            _ => serde_json::Value::Null,
        }
    }
}

pub type RecognitionResult<T> = Result<T, RecognitionError>;

/// Trait for speech-to-text vendors
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Short adapter name, e.g. "mock"
    fn name(&self) -> &str;

    /// Transcribe the referenced audio
    async fn recognize(&self, request: &RecognitionRequest) -> RecognitionResult<Transcript>;
}

/// Picks the recognizer for a vendor
pub trait RecognizerResolver: Send + Sync {
    fn resolve(&self, vendor: &VendorDescriptor) -> RecognitionResult<Arc<dyn Recognizer>>;
}
