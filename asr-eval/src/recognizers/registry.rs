//! Recognizer registry keyed by vendor kind

use indexmap::IndexMap;
use std::sync::Arc;

use super::mock::MockRecognizer;
use super::replay::ReplayRecognizer;
use super::traits::{RecognitionError, RecognitionResult, Recognizer, RecognizerResolver};
use crate::cases::{VendorDescriptor, VendorKind};

/// Maps each vendor kind to the recognizer that serves it.
///
/// Unregistered kinds resolve to `RecognitionError::NoAdapter`; there is
/// no fallback recognizer.
#[derive(Default, Clone)]
pub struct RecognizerRegistry {
    recognizers: IndexMap<VendorKind, Arc<dyn Recognizer>>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the offline recognizers (mock and replay)
    pub fn with_builtin() -> Self {
        Self::new()
            .with(VendorKind::Mock, Arc::new(MockRecognizer::new()))
            .with(VendorKind::Replay, Arc::new(ReplayRecognizer::new()))
    }

    /// Register a recognizer, replacing any previous one for the kind
    pub fn register(&mut self, kind: VendorKind, recognizer: Arc<dyn Recognizer>) {
        if let Some(previous) = self.recognizers.insert(kind, recognizer) {
            tracing::debug!("Replaced recognizer {} for kind {}", previous.name(), kind);
        }
    }

    pub fn with(mut self, kind: VendorKind, recognizer: Arc<dyn Recognizer>) -> Self {
        self.register(kind, recognizer);
        self
    }

    pub fn kinds(&self) -> Vec<VendorKind> {
        self.recognizers.keys().copied().collect()
    }

    pub fn contains(&self, kind: VendorKind) -> bool {
        self.recognizers.contains_key(&kind)
    }
}

impl RecognizerResolver for RecognizerRegistry {
    fn resolve(&self, vendor: &VendorDescriptor) -> RecognitionResult<Arc<dyn Recognizer>> {
        self.recognizers
            .get(&vendor.kind)
            .cloned()
            .ok_or_else(|| RecognitionError::NoAdapter {
                vendor: vendor.name.clone(),
                kind: vendor.kind,
            })
    }
}

impl std::fmt::Debug for RecognizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
