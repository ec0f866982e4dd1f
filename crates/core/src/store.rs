use crate::error::{PackError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default priority store file name, next to the configuration file
pub const STORE_FILE_NAME: &str = ".contextpack_store.json";

/// Tag that lifts a file out of budgeting entirely
pub const ALWAYS_INCLUDE_TAG: &str = "always_include";

/// Learned record for one file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StoreRecord {
    /// Learned utility in [0, 1]
    #[serde(default)]
    pub utility: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Optional path to a shadow file carrying a cached rendition
    #[serde(default)]
    pub shadow: Option<String>,
}

/// Read-only learned-utility store.
///
/// The pipeline consults it for priority blending and `always_include`
/// tags but never writes it; a missing or unreadable store is not fatal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriorityStore {
    #[serde(default)]
    files: HashMap<String, StoreRecord>,
}

impl PriorityStore {
    /// Load a store file. Callers treat failure as "no learned priority";
    /// the error carries the reason for the one-time log line.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| PackError::config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&source)
            .map_err(|e| PackError::config(format!("malformed store {}: {e}", path.display())))
    }

    pub fn from_records(files: HashMap<String, StoreRecord>) -> Self {
        Self { files }
    }

    pub fn get(&self, rel_path: &str) -> Option<&StoreRecord> {
        self.files.get(rel_path)
    }

    /// Learned utility for a path, clamped to [0, 1]
    pub fn utility(&self, rel_path: &str) -> Option<f64> {
        self.get(rel_path).map(|r| r.utility.clamp(0.0, 1.0))
    }

    pub fn always_include(&self, rel_path: &str) -> bool {
        self.get(rel_path)
            .is_some_and(|r| r.tags.iter().any(|t| t == ALWAYS_INCLUDE_TAG))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
