use crate::error::Result;
use crate::lens::PriorityGroup;
use crate::store::PriorityStore;
use contextpack_analyzers::TruncateMode;
use contextpack_walker::PatternSet;

/// Priority of a file no group claims
pub const DEFAULT_PRIORITY: i64 = 50;

/// Weight of the static (lens) component in the blend
const STATIC_WEIGHT: f64 = 0.7;
/// Weight of the learned (store) component in the blend
const LEARNED_WEIGHT: f64 = 0.3;

/// Resolution outcome for one file
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPriority {
    pub priority: i64,
    pub always_include: bool,
    /// Truncation overrides from the winning group, if any
    pub truncate_mode: Option<TruncateMode>,
    pub truncate_lines: Option<usize>,
}

struct CompiledGroup {
    matcher: PatternSet,
    group: PriorityGroup,
}

/// Maps each file to a numeric priority by blending the static group
/// priority with the learned utility from the store.
pub struct PriorityResolver {
    groups: Vec<CompiledGroup>,
    store: Option<PriorityStore>,
}

impl PriorityResolver {
    /// Compile the lens groups once per run; invalid group patterns are
    /// configuration errors.
    pub fn new(groups: &[PriorityGroup], store: Option<&PriorityStore>) -> Result<Self> {
        let compiled = groups
            .iter()
            .map(|group| {
                Ok(CompiledGroup {
                    matcher: PatternSet::compile(std::slice::from_ref(&group.pattern))?,
                    group: group.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            groups: compiled,
            store: store.cloned(),
        })
    }

    /// Highest priority among matching groups, or the default
    fn static_priority(&self, rel_path: &str) -> (i64, Option<&CompiledGroup>) {
        let mut best: Option<&CompiledGroup> = None;
        for candidate in &self.groups {
            if !candidate.matcher.matches(rel_path) {
                continue;
            }
            if best.map_or(true, |b| candidate.group.priority > b.group.priority) {
                best = Some(candidate);
            }
        }
        match best {
            Some(group) => (group.group.priority, Some(group)),
            None => (DEFAULT_PRIORITY, None),
        }
    }

    /// Resolve the final priority for a file.
    ///
    /// `final = round(0.7 * static + 0.3 * learned * 100)` when the store
    /// knows the file; the static priority alone otherwise.
    pub fn resolve(&self, rel_path: &str) -> ResolvedPriority {
        let (static_priority, winning) = self.static_priority(rel_path);

        let learned = self
            .store
            .as_ref()
            .and_then(|store| store.utility(rel_path));
        let priority = match learned {
            Some(utility) => {
                (STATIC_WEIGHT * static_priority as f64 + LEARNED_WEIGHT * utility * 100.0).round()
                    as i64
            }
            None => static_priority,
        };

        let store_always = self
            .store
            .as_ref()
            .is_some_and(|store| store.always_include(rel_path));
        let group_always = winning.is_some_and(|g| g.group.always_include);

        ResolvedPriority {
            priority,
            always_include: store_always || group_always,
            truncate_mode: winning.and_then(|g| g.group.truncate_mode),
            truncate_lines: winning.and_then(|g| g.group.truncate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRecord;
    use std::collections::HashMap;

    fn groups() -> Vec<PriorityGroup> {
        let g = |pattern: &str, priority: i64| PriorityGroup {
            pattern: pattern.to_string(),
            priority,
            truncate_mode: None,
            truncate: None,
            always_include: false,
        };
        vec![
            g("src/core/**", 100),
            g("*.py", 80),
            g("*.json", 60),
            g("tests/**", 10),
        ]
    }

    fn resolver(store: Option<PriorityStore>) -> PriorityResolver {
        PriorityResolver::new(&groups(), store.as_ref()).unwrap()
    }

    #[test]
    fn highest_matching_group_wins() {
        let r = resolver(None);
        // Matches both src/core/** (100) and *.py (80).
        assert_eq!(r.resolve("src/core/main.py").priority, 100);
        assert_eq!(r.resolve("main.py").priority, 80);
        assert_eq!(r.resolve("config.json").priority, 60);
    }

    #[test]
    fn unmatched_files_get_the_default() {
        let r = resolver(None);
        assert_eq!(r.resolve("unknown.xyz").priority, DEFAULT_PRIORITY);
        assert_eq!(r.resolve("random/file.c").priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn tests_pattern_applies_when_it_is_the_only_match() {
        let r = resolver(None);
        assert_eq!(r.resolve("tests/fixture.txt").priority, 10);
        // tests/**/*.py also matches *.py (80): highest wins.
        assert_eq!(r.resolve("tests/test_main.py").priority, 80);
    }

    #[test]
    fn learned_utility_blends_at_seventy_thirty() {
        let mut files = HashMap::new();
        files.insert(
            "main.py".to_string(),
            StoreRecord {
                utility: 1.0,
                ..Default::default()
            },
        );
        let r = resolver(Some(PriorityStore::from_records(files)));
        // round(0.7 * 80 + 0.3 * 100) = 86
        assert_eq!(r.resolve("main.py").priority, 86);
        // Files absent from the store keep their static priority.
        assert_eq!(r.resolve("other.py").priority, 80);
    }

    #[test]
    fn store_always_include_tag_bypasses() {
        let mut files = HashMap::new();
        files.insert(
            "main.py".to_string(),
            StoreRecord {
                utility: 0.5,
                tags: vec!["always_include".to_string()],
                ..Default::default()
            },
        );
        let r = resolver(Some(PriorityStore::from_records(files)));
        assert!(r.resolve("main.py").always_include);
        assert!(!r.resolve("other.py").always_include);
    }

    #[test]
    fn group_truncation_override_travels_with_the_win() {
        let groups = vec![PriorityGroup {
            pattern: "*.py".to_string(),
            priority: 80,
            truncate_mode: Some(TruncateMode::Structure),
            truncate: Some(100),
            always_include: true,
        }];
        let r = PriorityResolver::new(&groups, None).unwrap();
        let resolved = r.resolve("app.py");
        assert_eq!(resolved.truncate_mode, Some(TruncateMode::Structure));
        assert_eq!(resolved.truncate_lines, Some(100));
        assert!(resolved.always_include);

        let other = r.resolve("app.rs");
        assert!(other.truncate_mode.is_none());
        assert!(!other.always_include);
    }

    #[test]
    fn invalid_group_pattern_is_fatal() {
        let groups = vec![PriorityGroup {
            pattern: "src/[bad".to_string(),
            priority: 50,
            truncate_mode: None,
            truncate: None,
            always_include: false,
        }];
        assert!(PriorityResolver::new(&groups, None).is_err());
    }
}
