use crate::config::{PackConfig, DEFAULT_IGNORE_PATTERNS};
use crate::error::{PackError, Result};
use crate::options::{PackOptions, SortKey, SortOrder};
use contextpack_analyzers::TruncateMode;
use std::collections::HashMap;

/// One priority group inside a lens: files matching the pattern get the
/// group's priority and, optionally, its truncation override.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityGroup {
    pub pattern: String,
    pub priority: i64,
    pub truncate_mode: Option<TruncateMode>,
    pub truncate: Option<usize>,
    /// Files in this group bypass budgeting entirely
    pub always_include: bool,
}

/// A named bundle of selection, sorting, priority-grouping and
/// truncation defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LensConfig {
    pub description: String,
    /// Overrides top-level include patterns when non-empty
    pub include: Vec<String>,
    /// Extends top-level ignore patterns
    pub exclude: Vec<String>,
    pub truncate_mode: Option<TruncateMode>,
    pub truncate: Option<usize>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub groups: Vec<PriorityGroup>,
}

const KNOWN_LENS_KEYS: &[&str] = &[
    "description",
    "include",
    "exclude",
    "truncate_mode",
    "truncate",
    "sort_by",
    "sort_order",
    "groups",
];

const KNOWN_GROUP_KEYS: &[&str] = &[
    "pattern",
    "priority",
    "truncate_mode",
    "truncate",
    "always_include",
];

impl LensConfig {
    /// Parse one lens configuration object, diagnosing unknown keys
    pub fn parse(name: &str, value: &serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| PackError::config(format!("lens '{name}' must be an object")))?;

        for key in obj.keys() {
            if !KNOWN_LENS_KEYS.contains(&key.as_str()) {
                log::warn!("lens '{name}': ignoring unknown key '{key}'");
            }
        }

        let mut lens = LensConfig {
            description: obj
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        };

        if let Some(v) = obj.get("include") {
            lens.include = json_strings(v, name, "include")?;
        }
        if let Some(v) = obj.get("exclude") {
            lens.exclude = json_strings(v, name, "exclude")?;
        }
        if let Some(v) = obj.get("truncate_mode") {
            lens.truncate_mode = Some(parse_mode(v, name)?);
        }
        if let Some(v) = obj.get("truncate") {
            lens.truncate = Some(v.as_u64().ok_or_else(|| {
                PackError::config(format!("lens '{name}': 'truncate' must be an integer"))
            })? as usize);
        }
        if let Some(v) = obj.get("sort_by") {
            let raw = v.as_str().unwrap_or_default();
            lens.sort_by = Some(SortKey::parse(raw).ok_or_else(|| {
                PackError::config(format!("lens '{name}': invalid sort_by '{raw}'"))
            })?);
        }
        if let Some(v) = obj.get("sort_order") {
            let raw = v.as_str().unwrap_or_default();
            lens.sort_order = Some(SortOrder::parse(raw).ok_or_else(|| {
                PackError::config(format!("lens '{name}': invalid sort_order '{raw}'"))
            })?);
        }
        if let Some(v) = obj.get("groups") {
            let items = v.as_array().ok_or_else(|| {
                PackError::config(format!("lens '{name}': 'groups' must be a list"))
            })?;
            for item in items {
                lens.groups.push(parse_group(item, name)?);
            }
        }

        Ok(lens)
    }
}

fn json_strings(value: &serde_json::Value, lens: &str, key: &str) -> Result<Vec<String>> {
    value
        .as_array()
        .ok_or_else(|| PackError::config(format!("lens '{lens}': '{key}' must be a list")))?
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                PackError::config(format!("lens '{lens}': '{key}' must contain strings"))
            })
        })
        .collect()
}

fn parse_mode(value: &serde_json::Value, lens: &str) -> Result<TruncateMode> {
    let raw = value.as_str().unwrap_or_default();
    TruncateMode::parse(raw)
        .ok_or_else(|| PackError::config(format!("lens '{lens}': invalid truncate_mode '{raw}'")))
}

fn parse_group(value: &serde_json::Value, lens: &str) -> Result<PriorityGroup> {
    let obj = value
        .as_object()
        .ok_or_else(|| PackError::config(format!("lens '{lens}': group must be an object")))?;

    for key in obj.keys() {
        if !KNOWN_GROUP_KEYS.contains(&key.as_str()) {
            log::warn!("lens '{lens}': ignoring unknown group key '{key}'");
        }
    }

    let pattern = obj
        .get("pattern")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PackError::config(format!("lens '{lens}': group needs a 'pattern'")))?
        .to_string();
    let priority = obj
        .get("priority")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| PackError::config(format!("lens '{lens}': group needs a 'priority'")))?;

    Ok(PriorityGroup {
        pattern,
        priority,
        truncate_mode: obj.get("truncate_mode").map(|v| parse_mode(v, lens)).transpose()?,
        truncate: obj.get("truncate").and_then(|v| v.as_u64()).map(|v| v as usize),
        always_include: obj
            .get("always_include")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
    })
}

fn group(pattern: &str, priority: i64) -> PriorityGroup {
    PriorityGroup {
        pattern: pattern.to_string(),
        priority,
        truncate_mode: None,
        truncate: None,
        always_include: false,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Registry of built-in and user-defined lenses
pub struct LensManager {
    built_in: HashMap<String, LensConfig>,
    custom: HashMap<String, LensConfig>,
}

impl LensManager {
    pub fn new() -> Self {
        let mut built_in = HashMap::new();

        // architecture: signatures only, source and manifests.
        built_in.insert(
            "architecture".to_string(),
            LensConfig {
                description: "High-level code structure and configuration".to_string(),
                include: strings(&[
                    "*.py", "*.js", "*.ts", "*.rs", "*.sh", "*.json", "*.toml", "*.yaml",
                    "*.yml", "Dockerfile", "Makefile", "README.md",
                ]),
                exclude: strings(&["tests/**", "test/**", "docs/**", "doc/**", "*.txt"]),
                truncate_mode: Some(TruncateMode::Structure),
                truncate: Some(2000),
                sort_by: Some(SortKey::Name),
                sort_order: Some(SortOrder::Asc),
                groups: vec![
                    group("src/**", 90),
                    group("crates/**", 90),
                    group("lib/**", 85),
                    group("*.rs", 80),
                    group("*.py", 80),
                    group("*.ts", 75),
                    group("*.js", 75),
                    group("Cargo.toml", 70),
                    group("package.json", 70),
                    group("pyproject.toml", 70),
                    group("README.md", 65),
                    group("tests/**", 20),
                ],
            },
        );

        // debug: everything, newest first, untruncated.
        built_in.insert(
            "debug".to_string(),
            LensConfig {
                description: "Recent changes for debugging".to_string(),
                include: Vec::new(),
                exclude: Vec::new(),
                truncate_mode: Some(TruncateMode::None),
                truncate: Some(0),
                sort_by: Some(SortKey::Mtime),
                sort_order: Some(SortOrder::Desc),
                groups: Vec::new(),
            },
        );

        // security: auth, crypto and dependency manifests.
        built_in.insert(
            "security".to_string(),
            LensConfig {
                description: "Security-relevant files (auth, secrets, dependencies)".to_string(),
                include: strings(&[
                    "**/*auth*",
                    "**/*security*",
                    "**/*secret*",
                    "**/*credential*",
                    "**/*crypto*",
                    "**/*token*",
                    "package.json",
                    "requirements.txt",
                    "Cargo.toml",
                    "pyproject.toml",
                    "Dockerfile",
                ]),
                exclude: strings(&["tests/**", "test/**", "docs/**"]),
                truncate_mode: Some(TruncateMode::Smart),
                truncate: Some(300),
                sort_by: Some(SortKey::Name),
                sort_order: Some(SortOrder::Asc),
                groups: vec![
                    group("**/*auth*", 95),
                    group("**/*secret*", 95),
                    group("**/*credential*", 95),
                    group("**/*crypto*", 90),
                    group("**/*security*", 90),
                    group("**/*token*", 85),
                ],
            },
        );

        // onboarding: a balanced first look at a project.
        built_in.insert(
            "onboarding".to_string(),
            LensConfig {
                description: "Essential files for new contributors".to_string(),
                include: Vec::new(),
                exclude: Vec::new(),
                truncate_mode: Some(TruncateMode::Smart),
                truncate: Some(400),
                sort_by: Some(SortKey::Name),
                sort_order: Some(SortOrder::Asc),
                groups: vec![
                    group("README.md", 95),
                    group("CONTRIBUTING.md", 90),
                    group("**/main.py", 85),
                    group("**/main.rs", 85),
                    group("**/index.js", 85),
                    group("**/index.ts", 85),
                    group("src/**", 80),
                    group("Cargo.toml", 75),
                    group("package.json", 75),
                    group("docs/**", 60),
                    group("tests/**", 30),
                ],
            },
        );

        // minimal: entry points, readmes and manifests, nothing else.
        built_in.insert(
            "minimal".to_string(),
            LensConfig {
                description: "Entry points, readmes and manifests only".to_string(),
                include: strings(&[
                    "README.md",
                    "README.rst",
                    "README.txt",
                    "Cargo.toml",
                    "package.json",
                    "pyproject.toml",
                    "setup.py",
                    "go.mod",
                    "Makefile",
                    "Dockerfile",
                    "**/main.py",
                    "**/main.rs",
                    "**/index.js",
                    "**/index.ts",
                    "**/__main__.py",
                ]),
                exclude: Vec::new(),
                truncate_mode: Some(TruncateMode::None),
                truncate: Some(0),
                sort_by: Some(SortKey::Name),
                sort_order: Some(SortOrder::Asc),
                groups: vec![
                    group("README.md", 95),
                    group("**/main.py", 90),
                    group("**/main.rs", 90),
                    group("**/index.js", 90),
                    group("Cargo.toml", 80),
                    group("package.json", 80),
                ],
            },
        );

        Self {
            built_in,
            custom: HashMap::new(),
        }
    }

    /// Register user-defined lenses; they shadow built-ins by name
    pub fn load_custom(&mut self, lenses: HashMap<String, LensConfig>) {
        self.custom = lenses;
    }

    /// Get a lens by name (custom first, then built-in)
    pub fn get(&self, name: &str) -> Option<&LensConfig> {
        self.custom.get(name).or_else(|| self.built_in.get(name))
    }

    /// Available lens names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.built_in.keys().cloned().collect();
        names.extend(self.custom.keys().cloned());
        names.sort();
        names.dedup();
        names
    }

    fn resolve(&self, name: &str) -> Result<&LensConfig> {
        self.get(name).ok_or_else(|| PackError::UnknownLens {
            name: name.to_string(),
            available: self.available().join(", "),
        })
    }
}

impl Default for LensManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Final parameters for one run after merging every layer of defaults
#[derive(Debug, Clone)]
pub struct EffectivePlan {
    pub lens_name: Option<String>,
    pub lens_description: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub mode: TruncateMode,
    pub limit: usize,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub groups: Vec<PriorityGroup>,
}

/// Merge caller overrides, the active lens, the configuration file and
/// built-in defaults into one effective plan.
pub fn build_plan(options: &PackOptions, manager: &LensManager) -> Result<EffectivePlan> {
    let lens = options
        .lens
        .as_deref()
        .map(|name| manager.resolve(name))
        .transpose()?;

    let mut exclude: Vec<String> = Vec::new();
    if options.use_default_excludes {
        exclude.extend(DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()));
    }
    exclude.extend(options.config.ignore_patterns.iter().cloned());
    if let Some(lens) = lens {
        exclude.extend(lens.exclude.iter().cloned());
    }
    exclude.extend(options.exclude.iter().cloned());

    let include = if !options.include.is_empty() {
        options.include.clone()
    } else if let Some(lens) = lens.filter(|l| !l.include.is_empty()) {
        lens.include.clone()
    } else {
        options.config.include_patterns.clone()
    };

    let mode = options
        .truncate_mode
        .or_else(|| lens.and_then(|l| l.truncate_mode))
        .unwrap_or(TruncateMode::None);
    let limit = options
        .truncate_lines
        .or_else(|| lens.and_then(|l| l.truncate))
        .unwrap_or(0);
    let sort_by = options
        .sort_by
        .or_else(|| lens.and_then(|l| l.sort_by))
        .unwrap_or(SortKey::Name);
    let sort_order = options
        .sort_order
        .or_else(|| lens.and_then(|l| l.sort_order))
        .unwrap_or(SortOrder::Asc);

    let plan = EffectivePlan {
        lens_name: options.lens.clone(),
        lens_description: lens.map(|l| l.description.clone()).unwrap_or_default(),
        include,
        exclude,
        mode,
        limit,
        sort_by,
        sort_order,
        groups: lens.map(|l| l.groups.clone()).unwrap_or_default(),
    };

    log_manifest(&plan);
    Ok(plan)
}

/// Lens manifest on the diagnostic channel, once per run
fn log_manifest(plan: &EffectivePlan) {
    match &plan.lens_name {
        Some(name) => log::info!(
            "lens '{name}': {} (mode={}, limit={}, sort={} {})",
            plan.lens_description,
            plan.mode,
            plan.limit,
            plan.sort_by.as_str(),
            plan.sort_order.as_str()
        ),
        None => log::info!(
            "no lens active (mode={}, limit={}, sort={} {})",
            plan.mode,
            plan.limit,
            plan.sort_by.as_str(),
            plan.sort_order.as_str()
        ),
    }
}
