//! Deterministic offline recognizer

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::traits::{
    RecognitionError, RecognitionRequest, RecognitionResult, Recognizer, Transcript,
};

/// Recognizer that never leaves the process.
///
/// Behavior is driven by the vendor's settings:
/// - `transcript` (string): text to return instead of the default
/// - `fail` (bool): fail every call with a vendor error
/// - `latency_ms` (integer): simulated call duration
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer;

impl MockRecognizer {
    pub fn new() -> Self {
        Self
    }

    fn default_transcript(request: &RecognitionRequest) -> String {
        let language = if request.language_code.is_empty() {
            "und"
        } else {
            request.language_code.as_str()
        };
        format!("mock transcript of {} in {}", request.audio_ref, language)
    }
}

fn bool_setting(request: &RecognitionRequest, key: &str) -> RecognitionResult<bool> {
    match request.vendor.setting(key) {
        None => Ok(false),
        Some(value) => value.as_bool().ok_or_else(|| {
            RecognitionError::InvalidSettings(format!("{} must be a boolean, got {}", key, value))
        }),
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, request: &RecognitionRequest) -> RecognitionResult<Transcript> {
        tracing::debug!(
            "Mock recognize: audio={} language={} vendor={}",
            request.audio_ref,
            request.language_code,
            request.vendor.name
        );

        if let Some(value) = request.vendor.setting("latency_ms") {
            let ms = value.as_u64().ok_or_else(|| {
                RecognitionError::InvalidSettings(format!(
                    "latency_ms must be a non-negative integer, got {}",
                    value
                ))
            })?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        if bool_setting(request, "fail")? {
            let message = format!("simulated failure from {} for {}", request.vendor.name, request.audio_ref);
            return Err(RecognitionError::Vendor {
                raw_payload: Some(json!({ "error": message.clone() })),
                message,
            });
        }

        let text = match request.vendor.setting("transcript") {
            None => Self::default_transcript(request),
            Some(value) => value
                .as_str()
                .map(String::from)
                .ok_or_else(|| {
                    RecognitionError::InvalidSettings(format!("transcript must be a string, got {}", value))
                })?,
        };

        let raw_payload = json!({
            "transcription": text.clone(),
            "confidence": 0.95,
            "simulated": true,
        });

        Ok(Transcript::new(text, raw_payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{VendorDescriptor, VendorKind};

    fn request(vendor: VendorDescriptor) -> RecognitionRequest {
        RecognitionRequest::new("audio/1.wav", "en-US", vendor)
    }

    #[tokio::test]
    async fn test_default_transcript() {
        let vendor = VendorDescriptor::new(1, "MockASR", VendorKind::Mock);
        let transcript = MockRecognizer::new().recognize(&request(vendor)).await.unwrap();
        assert_eq!(transcript.text, "mock transcript of audio/1.wav in en-US");
        assert_eq!(transcript.raw_payload["simulated"], true);
        assert_eq!(transcript.raw_payload["transcription"], transcript.text.as_str());
    }

    #[tokio::test]
    async fn test_configured_transcript_may_be_empty() {
        let vendor = VendorDescriptor::new(1, "Silent", VendorKind::Mock).with_setting("transcript", "");
        let transcript = MockRecognizer::new().recognize(&request(vendor)).await.unwrap();
        assert_eq!(transcript.text, "");
    }

    #[tokio::test]
    async fn test_simulated_failure_keeps_payload() {
        let vendor = VendorDescriptor::new(2, "MockASR-Error", VendorKind::Mock).with_setting("fail", true);
        let err = MockRecognizer::new().recognize(&request(vendor)).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Vendor { .. }));
        assert!(err.raw_payload()["error"].as_str().unwrap().contains("MockASR-Error"));
    }

    #[tokio::test]
    async fn test_invalid_settings() {
        let vendor = VendorDescriptor::new(3, "m", VendorKind::Mock).with_setting("fail", "yes");
        let err = MockRecognizer::new().recognize(&request(vendor)).await.unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidSettings(_)));

        let vendor = VendorDescriptor::new(4, "m", VendorKind::Mock).with_setting("transcript", 12);
        let err = MockRecognizer::new().recognize(&request(vendor)).await.unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidSettings(_)));
    }

    #[tokio::test]
    async fn test_language_fallback() {
        let vendor = VendorDescriptor::new(5, "m", VendorKind::Mock);
        let req = RecognitionRequest::new("x.wav", "", vendor);
        let transcript = MockRecognizer::new().recognize(&req).await.unwrap();
        assert!(transcript.text.ends_with("in und"));
    }
}
