use crate::error::{Result, WalkError};
use glob::{MatchOptions, Pattern};

/// Match options shared by every compiled pattern.
///
/// `require_literal_separator` keeps `*` within one path segment while `**`
/// spans segments; matching is case-sensitive against forward-slash paths.
fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// A single glob pattern compiled for path and segment matching
#[derive(Debug, Clone)]
struct CompiledPattern {
    raw: String,
    whole: Pattern,
    /// Per-segment patterns, used for the conservative prune test
    segments: Vec<Pattern>,
    /// Whether the pattern contains a path separator
    anchored: bool,
}

impl CompiledPattern {
    fn compile(raw: &str) -> Result<Self> {
        let whole =
            Pattern::new(raw).map_err(|e| WalkError::invalid_pattern(raw, e))?;
        let segments = raw
            .split('/')
            .map(|seg| Pattern::new(seg).map_err(|e| WalkError::invalid_pattern(raw, e)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            raw: raw.to_string(),
            whole,
            segments,
            anchored: raw.contains('/'),
        })
    }

    /// Whether this pattern matches the given relative path.
    ///
    /// A pattern without a separator matches against any single path segment
    /// as well as against the whole path.
    fn matches(&self, rel_path: &str) -> bool {
        let opts = match_options();
        if self.whole.matches_with(rel_path, opts) {
            return true;
        }
        if !self.anchored {
            return rel_path
                .split('/')
                .any(|segment| self.whole.matches_with(segment, opts));
        }
        false
    }

    /// Whether this pattern could match some path strictly inside `rel_dir`.
    ///
    /// Used by the prune test; errs on the side of "yes" so that pruning
    /// never hides a file an include pattern could have admitted.
    fn could_reach_inside(&self, rel_dir: &str) -> bool {
        if !self.anchored {
            // A bare pattern can match a file name at any depth.
            return true;
        }

        let opts = match_options();
        let dir_segments: Vec<&str> = rel_dir.split('/').collect();
        for (i, dir_segment) in dir_segments.iter().enumerate() {
            match self.segments.get(i) {
                None => return false,
                Some(seg) => {
                    if seg.as_str() == "**" {
                        return true;
                    }
                    if !seg.matches_with(dir_segment, opts) {
                        return false;
                    }
                }
            }
        }
        // Every directory segment matched; the pattern reaches inside only
        // if it still has segments left to consume.
        self.segments.len() > dir_segments.len()
    }
}

/// An ordered sequence of glob patterns compiled into a match function
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compile a list of raw patterns, rejecting the first invalid one
    pub fn compile<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let patterns = raw
            .iter()
            .map(|p| CompiledPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether any pattern in the set matches the relative path
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel_path))
    }

    fn could_reach_inside(&self, rel_dir: &str) -> bool {
        self.patterns.iter().any(|p| p.could_reach_inside(rel_dir))
    }

    /// Raw source patterns, in compile order
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.raw.as_str())
    }
}

/// Include/exclude pattern pair with the admission semantics of the pipeline:
/// an empty include set admits everything the exclude set does not remove,
/// a non-empty include set whitelists.
#[derive(Debug, Clone, Default)]
pub struct GlobFilter {
    include: PatternSet,
    exclude: PatternSet,
}

impl GlobFilter {
    pub fn new(include: PatternSet, exclude: PatternSet) -> Self {
        Self { include, exclude }
    }

    /// Compile both sets from raw pattern lists
    pub fn compile<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: PatternSet::compile(include)?,
            exclude: PatternSet::compile(exclude)?,
        })
    }

    /// Whether a file at this relative path is admitted
    pub fn admits(&self, rel_path: &str) -> bool {
        if !self.include.is_empty() && !self.include.matches(rel_path) {
            return false;
        }
        !self.exclude.matches(rel_path)
    }

    /// Whether a directory subtree can be skipped entirely.
    ///
    /// Conservative: prunes only when the directory matches the exclude set
    /// and no include pattern could match a descendant.
    pub fn prunes(&self, rel_dir: &str) -> bool {
        self.exclude.matches(rel_dir) && !self.include.could_reach_inside(rel_dir)
    }

    pub fn include(&self) -> &PatternSet {
        &self.include
    }

    pub fn exclude(&self) -> &PatternSet {
        &self.exclude
    }
}
