use crate::error::{PackError, Result};
use crate::lens::LensConfig;
use std::collections::HashMap;
use std::path::Path;

/// Default configuration file name, discovered in the repository root
pub const CONFIG_FILE_NAME: &str = ".contextpack_config.json";

/// Hygiene exclusions seeded into every run before config and lens
/// patterns. Dependency trees, VCS metadata and build output never belong
/// in a context artifact.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "target",
    "dist",
    "build",
    ".idea",
    ".vscode",
    ".DS_Store",
    "*.pyc",
    "*.swp",
    "*.swo",
];

/// Parsed configuration file
#[derive(Debug, Clone, Default)]
pub struct PackConfig {
    /// Globs added to the exclude set
    pub ignore_patterns: Vec<String>,
    /// Globs forming the include set (non-empty means whitelist)
    pub include_patterns: Vec<String>,
    /// User-defined lenses by name
    pub lenses: HashMap<String, LensConfig>,
}

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["ignore_patterns", "include_patterns", "lenses"];

impl PackConfig {
    /// Parse a configuration document. Malformed JSON is fatal; unknown
    /// keys are ignored with a one-line diagnostic.
    pub fn parse(source: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(source)
            .map_err(|e| PackError::config(format!("malformed configuration JSON: {e}")))?;

        let obj = value
            .as_object()
            .ok_or_else(|| PackError::config("configuration root must be a JSON object"))?;

        for key in obj.keys() {
            if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
                log::warn!("ignoring unknown configuration key '{key}'");
            }
        }

        let ignore_patterns = string_list(obj.get("ignore_patterns"), "ignore_patterns")?;
        let include_patterns = string_list(obj.get("include_patterns"), "include_patterns")?;

        let mut lenses = HashMap::new();
        if let Some(raw) = obj.get("lenses") {
            let map = raw
                .as_object()
                .ok_or_else(|| PackError::config("'lenses' must be an object"))?;
            for (name, lens_value) in map {
                let lens = LensConfig::parse(name, lens_value)?;
                lenses.insert(name.clone(), lens);
            }
        }

        Ok(Self {
            ignore_patterns,
            include_patterns,
            lenses,
        })
    }

    /// Load a configuration file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            PackError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&source)
    }

    /// Load `.contextpack_config.json` from the root if present,
    /// otherwise return defaults
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            log::debug!("loading configuration from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

fn string_list(value: Option<&serde_json::Value>, key: &str) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| PackError::config(format!("'{key}' must be a list of strings")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| PackError::config(format!("'{key}' must be a list of strings")))
        })
        .collect()
}
