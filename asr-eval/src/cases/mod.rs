//! Test cases, vendor descriptors and the lookups that resolve them

pub mod catalog;
pub mod kinds;
pub mod loader;

pub use catalog::Catalog;
pub use kinds::VendorKind;
pub use loader::{
    load_catalog_from_directory, load_catalog_from_file, load_catalog_from_json_str,
    load_catalog_from_toml_str, CatalogError,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type TestCaseId = u64;
pub type VendorId = u64;
pub type JobId = u64;

/// Opaque key/value parameters passed through to recognizers
pub type ParamBag = serde_json::Map<String, serde_json::Value>;

/// A single audio sample to evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRef {
    pub id: TestCaseId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub language_code: Option<String>,
    /// Object-store key or path; never interpreted here
    pub audio_ref: String,
    #[serde(default)]
    pub ground_truth: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TestCaseRef {
    pub fn new(id: TestCaseId, audio_ref: impl Into<String>) -> Self {
        Self {
            id,
            name: Self::default_name(id),
            language_code: None,
            audio_ref: audio_ref.into(),
            ground_truth: None,
            tags: Vec::new(),
            description: None,
        }
    }

    /// Name used when none is given
    pub fn default_name(id: TestCaseId) -> String {
        format!("case-{}", id)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }

    pub fn with_ground_truth(mut self, text: impl Into<String>) -> Self {
        self.ground_truth = Some(text.into());
        self
    }

    /// Ground truth if present; an empty string counts as absent.
    pub fn ground_truth(&self) -> Option<&str> {
        self.ground_truth.as_deref().filter(|t| !t.is_empty())
    }

    pub fn language(&self) -> &str {
        self.language_code.as_deref().unwrap_or("")
    }

    /// Exact language match and every tag present
    pub fn matches(&self, language: Option<&str>, tags: &[String]) -> bool {
        let language_ok = language.map_or(true, |lang| self.language_code.as_deref() == Some(lang));
        language_ok && tags.iter().all(|tag| self.tags.contains(tag))
    }
}

/// A configured recognition vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorDescriptor {
    pub id: VendorId,
    pub name: String,
    pub kind: VendorKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Vendor-specific settings, read only by the matching recognizer
    #[serde(default)]
    pub settings: ParamBag,
}

impl VendorDescriptor {
    pub fn new(id: VendorId, name: impl Into<String>, kind: VendorKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            endpoint: None,
            settings: ParamBag::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings.get(key)
    }
}

/// Failure to resolve an id against a store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("store error: {0}")]
    Store(String),
}

impl LookupError {
    pub fn test_case_not_found(id: TestCaseId) -> Self {
        LookupError::NotFound { entity: "test case", id }
    }

    pub fn vendor_not_found(id: VendorId) -> Self {
        LookupError::NotFound { entity: "vendor", id }
    }
}

/// Resolves test case ids
#[async_trait]
pub trait TestCaseLookup: Send + Sync {
    async fn test_case(&self, id: TestCaseId) -> Result<TestCaseRef, LookupError>;
}

/// Resolves vendor ids
#[async_trait]
pub trait VendorLookup: Send + Sync {
    async fn vendor(&self, id: VendorId) -> Result<VendorDescriptor, LookupError>;
}
