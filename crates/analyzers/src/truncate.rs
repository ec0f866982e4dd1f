use crate::analysis::{analyzer_for, KeepRange, SALIENCE_IMPORT};
use crate::language::Language;
use serde::{Deserialize, Serialize};

/// Truncation mode applied to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateMode {
    /// Content passes through unchanged
    None,
    /// First N lines
    Simple,
    /// Analyzer-chosen important ranges up to a line budget
    Smart,
    /// Declarations only: imports, signatures, module docs
    Structure,
}

impl TruncateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TruncateMode::None => "none",
            TruncateMode::Simple => "simple",
            TruncateMode::Smart => "smart",
            TruncateMode::Structure => "structure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(TruncateMode::None),
            "simple" => Some(TruncateMode::Simple),
            "smart" => Some(TruncateMode::Smart),
            "structure" => Some(TruncateMode::Structure),
            _ => None,
        }
    }

    /// One step down the degradation chain: structure → smart → simple → none
    pub fn degraded(self) -> Option<Self> {
        match self {
            TruncateMode::Structure => Some(TruncateMode::Smart),
            TruncateMode::Smart => Some(TruncateMode::Simple),
            TruncateMode::Simple => Some(TruncateMode::None),
            TruncateMode::None => None,
        }
    }
}

impl std::fmt::Display for TruncateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of truncating one file's content
#[derive(Debug, Clone)]
pub struct Truncation {
    /// Retained content, including omission markers and summary lines
    pub content: String,
    /// Line count of the original content
    pub original_lines: usize,
    /// Count of retained source lines (markers and summaries excluded)
    pub final_lines: usize,
    /// Whether any source line was removed
    pub truncated: bool,
    /// The mode that actually ran, after any degradation
    pub applied: TruncateMode,
}

impl Truncation {
    fn unchanged(content: &str, lines: usize, applied: TruncateMode) -> Self {
        Self {
            content: content.to_string(),
            original_lines: lines,
            final_lines: lines,
            truncated: false,
            applied,
        }
    }
}

/// Applies a truncation mode and line limit to file content.
///
/// Truncation removes lines but never reorders them. When a mode cannot
/// run (an unknown language has no structure ranges, an analyzer found
/// nothing to keep) it degrades one step rather than failing.
#[derive(Debug, Clone, Copy)]
pub struct Truncator {
    mode: TruncateMode,
    limit: usize,
}

impl Truncator {
    pub fn new(mode: TruncateMode, limit: usize) -> Self {
        Self { mode, limit }
    }

    pub fn mode(&self) -> TruncateMode {
        self.mode
    }

    pub fn apply(&self, content: &str, language: Language) -> Truncation {
        let raw: Vec<&str> = content.split_inclusive('\n').collect();
        match self.mode {
            TruncateMode::None => Truncation::unchanged(content, raw.len(), TruncateMode::None),
            TruncateMode::Simple => self.apply_simple(content, &raw),
            TruncateMode::Smart => self.apply_smart(content, &raw, language),
            TruncateMode::Structure => self.apply_structure(content, &raw, language),
        }
    }

    fn apply_simple(&self, content: &str, raw: &[&str]) -> Truncation {
        if self.limit == 0 || raw.len() <= self.limit {
            return Truncation::unchanged(content, raw.len(), TruncateMode::Simple);
        }

        let mut out = String::new();
        for line in &raw[..self.limit] {
            push_line(&mut out, line);
        }
        out.push_str(&format!(
            "[... truncated: {} of {} lines ...]\n",
            self.limit,
            raw.len()
        ));

        Truncation {
            content: out,
            original_lines: raw.len(),
            final_lines: self.limit,
            truncated: true,
            applied: TruncateMode::Simple,
        }
    }

    fn apply_smart(&self, content: &str, raw: &[&str], language: Language) -> Truncation {
        let logical: Vec<&str> = raw
            .iter()
            .map(|l| l.trim_end_matches('\n').trim_end_matches('\r'))
            .collect();
        let analysis = analyzer_for(language).analyze(&logical);

        if analysis.smart.is_empty() {
            return self.apply_simple(content, raw);
        }

        let ranges = self.fit_ranges(analysis.smart);
        let kept: usize = ranges.iter().map(|r| r.range.len()).sum();

        if kept == raw.len() {
            // Nothing was elided; pass the content through untouched.
            return Truncation::unchanged(content, raw.len(), TruncateMode::Smart);
        }

        let mut out = String::new();
        let mut cursor = 0usize;
        for keep in &ranges {
            if keep.range.start > cursor {
                out.push_str(&format!(
                    "[... {} lines omitted ...]\n",
                    keep.range.start - cursor
                ));
            }
            for line in &raw[keep.range.start..keep.range.end] {
                push_line(&mut out, line);
            }
            cursor = keep.range.end;
        }
        if cursor < raw.len() {
            out.push_str(&format!("[... {} lines omitted ...]\n", raw.len() - cursor));
        }
        if let Some(summary) = analysis.facts.summary_line() {
            out.push_str(&summary);
            out.push('\n');
        }

        Truncation {
            content: out,
            original_lines: raw.len(),
            final_lines: kept,
            truncated: true,
            applied: TruncateMode::Smart,
        }
    }

    fn apply_structure(&self, content: &str, raw: &[&str], language: Language) -> Truncation {
        let logical: Vec<&str> = raw
            .iter()
            .map(|l| l.trim_end_matches('\n').trim_end_matches('\r'))
            .collect();
        let analysis = analyzer_for(language).analyze(&logical);

        if analysis.structure.is_empty() {
            // Unknown language or nothing declarative to keep.
            log::debug!(
                "structure mode degraded to smart ({} analyzer found no declarations)",
                language.as_str()
            );
            return self.apply_smart(content, raw, language);
        }

        let kept: usize = analysis.structure.iter().map(|r| r.len()).sum();
        if kept == raw.len() {
            return Truncation::unchanged(content, raw.len(), TruncateMode::Structure);
        }

        let mut out = String::new();
        for range in &analysis.structure {
            for line in &raw[range.start..range.end.min(raw.len())] {
                push_line(&mut out, line);
            }
        }

        Truncation {
            content: out,
            original_lines: raw.len(),
            final_lines: kept,
            truncated: true,
            applied: TruncateMode::Structure,
        }
    }

    /// Trim smart ranges down to the line limit.
    ///
    /// Whole ranges go first, lowest salience first with later ranges
    /// dropped before earlier ones; import ranges are exempt. If a single
    /// oversized range remains, its tail is cut instead.
    fn fit_ranges(&self, mut ranges: Vec<KeepRange>) -> Vec<KeepRange> {
        if self.limit == 0 {
            return ranges;
        }

        let mut kept: usize = ranges.iter().map(|r| r.range.len()).sum();
        while kept > self.limit {
            let victim = ranges
                .iter()
                .enumerate()
                .filter(|(_, r)| r.salience < SALIENCE_IMPORT)
                .min_by_key(|(_, r)| (r.salience, usize::MAX - r.range.start));
            let Some((idx, _)) = victim else { break };
            if ranges.len() == 1 {
                break;
            }
            kept -= ranges[idx].range.len();
            ranges.remove(idx);
        }

        // A single range larger than the limit is cut at the tail.
        if kept > self.limit {
            if let Some(last) = ranges
                .iter_mut()
                .rev()
                .find(|r| r.salience < SALIENCE_IMPORT)
            {
                let excess = kept - self.limit;
                if last.range.len() > excess {
                    last.range.end -= excess;
                }
            }
        }

        ranges
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY: &str = "import os\nclass A:\n    def f(self, x):\n        return x + 1\n";

    #[test]
    fn none_mode_passes_through() {
        let t = Truncator::new(TruncateMode::None, 10).apply(PY, Language::Python);
        assert_eq!(t.content, PY);
        assert!(!t.truncated);
        assert_eq!(t.original_lines, 4);
        assert_eq!(t.final_lines, 4);
    }

    #[test]
    fn simple_mode_keeps_prefix_and_annotates() {
        let t = Truncator::new(TruncateMode::Simple, 2).apply(PY, Language::Python);
        assert!(t.truncated);
        assert_eq!(t.final_lines, 2);
        assert_eq!(
            t.content,
            "import os\nclass A:\n[... truncated: 2 of 4 lines ...]\n"
        );
    }

    #[test]
    fn simple_mode_within_limit_is_untouched() {
        let t = Truncator::new(TruncateMode::Simple, 100).apply(PY, Language::Python);
        assert!(!t.truncated);
        assert_eq!(t.content, PY);
    }

    #[test]
    fn structure_mode_drops_bodies() {
        let t = Truncator::new(TruncateMode::Structure, 0).apply(PY, Language::Python);
        assert!(t.truncated);
        assert_eq!(t.original_lines, 4);
        assert_eq!(t.final_lines, 3);
        assert_eq!(t.content, "import os\nclass A:\n    def f(self, x):\n");
        assert_eq!(t.applied, TruncateMode::Structure);
    }

    #[test]
    fn structure_mode_degrades_to_smart_for_unknown_language() {
        let src = "line one\nline two\n";
        let t = Truncator::new(TruncateMode::Structure, 0).apply(src, Language::Unknown);
        // Fallback smart range covers everything, so nothing is removed.
        assert!(!t.truncated);
        assert_eq!(t.content, src);
    }

    #[test]
    fn smart_mode_collapses_omitted_spans_with_markers() {
        let src = "import os\n\nx = 1\ny = 2\n\ndef f():\n    return 1\n";
        let t = Truncator::new(TruncateMode::Smart, 0).apply(src, Language::Python);
        assert!(t.truncated);
        assert!(t.content.contains("import os\n"));
        assert!(t.content.contains("def f():\n"));
        assert!(t.content.contains("lines omitted ...]"));
        assert!(t.content.contains("[facts]"));
        assert!(!t.content.contains("return 1"));
    }

    #[test]
    fn smart_mode_always_retains_import_lines() {
        let mut src = String::from("import os\nimport sys\n");
        for i in 0..50 {
            src.push_str(&format!("def f{i}():\n    pass\n"));
        }
        let t = Truncator::new(TruncateMode::Smart, 5).apply(&src, Language::Python);
        assert!(t.content.contains("import os\n"));
        assert!(t.content.contains("import sys\n"));
    }

    #[test]
    fn smart_mode_trims_lowest_salience_ranges_first() {
        // Signatures (80) outrank the entry guard's doc? No: entry is 90.
        // Build a file whose smart set exceeds the limit so later
        // signature ranges are dropped before earlier ones.
        let mut src = String::new();
        for i in 0..10 {
            src.push_str(&format!("def f{i}(a, b, c):\n    return a\n"));
        }
        let t = Truncator::new(TruncateMode::Smart, 4).apply(&src, Language::Python);
        assert!(t.final_lines <= 4);
        assert!(t.content.contains("def f0"));
        assert!(!t.content.contains("def f9"));
    }

    #[test]
    fn smart_mode_on_unknown_language_respects_the_limit() {
        let src = (0..20).map(|i| format!("line {i}\n")).collect::<String>();
        let t = Truncator::new(TruncateMode::Smart, 5).apply(&src, Language::Unknown);
        assert_eq!(t.final_lines, 5);
        assert!(t.content.contains("line 0"));
        assert!(!t.content.contains("line 19"));
    }

    #[test]
    fn missing_trailing_newline_is_tolerated() {
        let t = Truncator::new(TruncateMode::Simple, 1).apply("a\nb", Language::Unknown);
        assert_eq!(t.original_lines, 2);
        assert_eq!(t.content, "a\n[... truncated: 1 of 2 lines ...]\n");
    }

    #[test]
    fn empty_content_is_a_no_op_in_every_mode() {
        for mode in [
            TruncateMode::None,
            TruncateMode::Simple,
            TruncateMode::Smart,
            TruncateMode::Structure,
        ] {
            let t = Truncator::new(mode, 3).apply("", Language::Python);
            assert_eq!(t.content, "");
            assert_eq!(t.original_lines, 0);
            assert!(!t.truncated);
        }
    }

    #[test]
    fn degradation_chain_is_ordered() {
        assert_eq!(TruncateMode::Structure.degraded(), Some(TruncateMode::Smart));
        assert_eq!(TruncateMode::Smart.degraded(), Some(TruncateMode::Simple));
        assert_eq!(TruncateMode::Simple.degraded(), Some(TruncateMode::None));
        assert_eq!(TruncateMode::None.degraded(), None);
    }

    #[test]
    fn mode_parsing_round_trips() {
        for mode in [
            TruncateMode::None,
            TruncateMode::Simple,
            TruncateMode::Smart,
            TruncateMode::Structure,
        ] {
            assert_eq!(TruncateMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(TruncateMode::parse("aggressive"), None);
    }
}
