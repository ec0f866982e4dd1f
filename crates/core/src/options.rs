use crate::config::PackConfig;
use crate::store::PriorityStore;
use contextpack_analyzers::TruncateMode;
use contextpack_walker::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};

/// Budget allocation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Skip files that do not fit
    Drop,
    /// Force structure mode on files that do not fit, then skip
    Truncate,
    /// Pre-structure files over 10% of the budget, then truncate
    Hybrid,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Drop => "drop",
            Strategy::Truncate => "truncate",
            Strategy::Hybrid => "hybrid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "drop" => Some(Strategy::Drop),
            "truncate" => Some(Strategy::Truncate),
            "hybrid" => Some(Strategy::Hybrid),
            _ => None,
        }
    }
}

/// Sort key for batch-mode output ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Mtime,
    Ctime,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Mtime => "mtime",
            SortKey::Ctime => "ctime",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(SortKey::Name),
            "mtime" => Some(SortKey::Mtime),
            "ctime" => Some(SortKey::Ctime),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// All state for one pack invocation, passed explicitly; the pipeline
/// keeps no globals. Precedence when a setting is expressible in more
/// than one place: explicit field here > active lens > configuration
/// file > built-in default.
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Active lens name, if any
    pub lens: Option<String>,
    /// Include patterns overriding lens and config includes
    pub include: Vec<String>,
    /// Exclude patterns added on top of lens and config excludes
    pub exclude: Vec<String>,
    /// Token budget; `None` disables budgeting
    pub budget: Option<usize>,
    /// Allocation strategy used when a budget is set
    pub strategy: Strategy,
    /// Truncation mode override
    pub truncate_mode: Option<TruncateMode>,
    /// Truncation line limit override
    pub truncate_lines: Option<usize>,
    /// Sort key override
    pub sort_by: Option<SortKey>,
    /// Sort order override
    pub sort_order: Option<SortOrder>,
    /// Emit in traversal order with low time-to-first-byte
    pub streaming: bool,
    /// Per-file size ceiling in bytes
    pub max_file_size: u64,
    /// Drop files whose resolved priority falls below this floor
    pub priority_floor: Option<i64>,
    /// Emit the synthetic meta record first
    pub emit_meta: bool,
    /// Seed the exclude set with the built-in hygiene patterns
    pub use_default_excludes: bool,
    /// Learned-utility store, already loaded; read-only
    pub store: Option<PriorityStore>,
    /// Parsed configuration file content
    pub config: PackConfig,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            lens: None,
            include: Vec::new(),
            exclude: Vec::new(),
            budget: None,
            strategy: Strategy::Hybrid,
            truncate_mode: None,
            truncate_lines: None,
            sort_by: None,
            sort_order: None,
            streaming: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            priority_floor: None,
            emit_meta: false,
            use_default_excludes: true,
            store: None,
            config: PackConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_parsing_round_trips() {
        for s in [Strategy::Drop, Strategy::Truncate, Strategy::Hybrid] {
            assert_eq!(Strategy::parse(s.as_str()), Some(s));
        }
        for k in [SortKey::Name, SortKey::Mtime, SortKey::Ctime] {
            assert_eq!(SortKey::parse(k.as_str()), Some(k));
        }
        for o in [SortOrder::Asc, SortOrder::Desc] {
            assert_eq!(SortOrder::parse(o.as_str()), Some(o));
        }
        assert_eq!(Strategy::parse("greedy"), None);
    }

    #[test]
    fn defaults_match_the_documented_contract() {
        let options = PackOptions::default();
        assert_eq!(options.strategy, Strategy::Hybrid);
        assert_eq!(options.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(options.use_default_excludes);
        assert!(!options.streaming);
        assert!(options.budget.is_none());
    }
}
