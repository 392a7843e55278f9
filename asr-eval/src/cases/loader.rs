//! Catalog loading from JSON and TOML files

use serde::Deserialize;
use std::path::Path;

use super::{Catalog, TestCaseRef, VendorDescriptor};

/// Error type for catalog loading
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Duplicate {entity} id {id}")]
    DuplicateId { entity: &'static str, id: u64 },

    #[error("Unsupported catalog format: {0}")]
    UnsupportedFormat(String),
}

/// On-disk catalog layout
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[allow(dead_code)]
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    test_cases: Vec<TestCaseRef>,
    #[serde(default)]
    vendors: Vec<VendorDescriptor>,
}

impl CatalogFile {
    fn into_catalog(self) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::new();
        for test_case in self.test_cases {
            catalog.insert_test_case(test_case)?;
        }
        for vendor in self.vendors {
            catalog.insert_vendor(vendor)?;
        }
        Ok(catalog)
    }
}

/// Parse a catalog from a JSON string
pub fn load_catalog_from_json_str(content: &str) -> Result<Catalog, CatalogError> {
    let file: CatalogFile =
        serde_json::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
    file.into_catalog()
}

/// Parse a catalog from a TOML string
pub fn load_catalog_from_toml_str(content: &str) -> Result<Catalog, CatalogError> {
    let file: CatalogFile =
        toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
    file.into_catalog()
}

/// Load a catalog file, choosing the parser by extension
pub fn load_catalog_from_file(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        "json" => load_catalog_from_json_str(&std::fs::read_to_string(path)?),
        "toml" => load_catalog_from_toml_str(&std::fs::read_to_string(path)?),
        other => Err(CatalogError::UnsupportedFormat(format!(
            "{:?} (extension {:?})",
            path, other
        ))),
    }
}

/// Merge every `.json` and `.toml` catalog in a directory.
///
/// Files are visited in name order. Files that fail to parse are logged
/// and skipped; duplicate ids across files are an error.
pub fn load_catalog_from_directory(dir: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("json" | "toml")))
        .collect();
    paths.sort();

    let mut catalog = Catalog::new();
    for path in paths {
        match load_catalog_from_file(&path) {
            Ok(part) => catalog.merge(part)?,
            Err(e) => {
                tracing::warn!("Failed to load catalog from {:?}: {}", path, e);
            }
        }
    }

    Ok(catalog)
}
