//! Recognizer that replays captured vendor transcripts

use async_trait::async_trait;
use serde_json::json;

use super::traits::{
    RecognitionError, RecognitionRequest, RecognitionResult, Recognizer, Transcript,
};

/// Looks up the transcript for an audio reference in the vendor's
/// `transcripts` setting, an object of `audio_ref -> text`.
///
/// Used to score output captured from a vendor earlier without calling it
/// again.
#[derive(Debug, Clone, Default)]
pub struct ReplayRecognizer;

impl ReplayRecognizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Recognizer for ReplayRecognizer {
    fn name(&self) -> &str {
        "replay"
    }

    async fn recognize(&self, request: &RecognitionRequest) -> RecognitionResult<Transcript> {
        let transcripts = request
            .vendor
            .setting("transcripts")
            .ok_or_else(|| {
                RecognitionError::InvalidSettings(format!(
                    "vendor {} has no transcripts table",
                    request.vendor.name
                ))
            })?
            .as_object()
            .ok_or_else(|| RecognitionError::InvalidSettings("transcripts must be a table".to_string()))?;

        let text = transcripts
            .get(&request.audio_ref)
            .ok_or_else(|| RecognitionError::NoTranscript(request.audio_ref.clone()))?
            .as_str()
            .ok_or_else(|| {
                RecognitionError::InvalidSettings(format!(
                    "transcript for {} must be a string",
                    request.audio_ref
                ))
            })?;

        Ok(Transcript::new(
            text,
            json!({ "replayed": true, "transcript": text }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{VendorDescriptor, VendorKind};

    fn vendor() -> VendorDescriptor {
        VendorDescriptor::new(1, "captured", VendorKind::Replay)
            .with_setting("transcripts", json!({ "a.wav": "hello there", "b.wav": "" }))
    }

    #[tokio::test]
    async fn test_replays_known_audio() {
        let req = RecognitionRequest::new("a.wav", "en", vendor());
        let transcript = ReplayRecognizer::new().recognize(&req).await.unwrap();
        assert_eq!(transcript.text, "hello there");
        assert_eq!(transcript.raw_payload["replayed"], true);

        let req = RecognitionRequest::new("b.wav", "en", vendor());
        assert_eq!(ReplayRecognizer::new().recognize(&req).await.unwrap().text, "");
    }

    #[tokio::test]
    async fn test_missing_audio() {
        let req = RecognitionRequest::new("c.wav", "en", vendor());
        let err = ReplayRecognizer::new().recognize(&req).await.unwrap_err();
        assert!(matches!(err, RecognitionError::NoTranscript(ref a) if a == "c.wav"));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let bare = VendorDescriptor::new(2, "bare", VendorKind::Replay);
        let req = RecognitionRequest::new("a.wav", "en", bare);
        let err = ReplayRecognizer::new().recognize(&req).await.unwrap_err();
        assert!(matches!(err, RecognitionError::InvalidSettings(_)));
    }
}
