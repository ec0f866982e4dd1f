use crate::language::Language;
use serde::Serialize;

/// Salience assigned to import lines; import ranges are never trimmed
pub const SALIENCE_IMPORT: u8 = 100;
/// Salience for entry points (main functions, script guards)
pub const SALIENCE_ENTRY: u8 = 90;
/// Salience for type and function signatures
pub const SALIENCE_SIGNATURE: u8 = 80;
/// Salience for documentation adjacent to a kept declaration
pub const SALIENCE_DOC: u8 = 60;
/// Salience for supporting context (continuation lines, nearby body)
pub const SALIENCE_CONTEXT: u8 = 40;

/// Half-open interval of 0-based line indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A line range worth retaining in smart mode, with a trim priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepRange {
    pub range: LineRange,
    pub salience: u8,
}

/// Facts extracted by a structural analyzer.
///
/// Fields not applicable to a language stay empty; the summary printer
/// only mentions populated ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facts {
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub decorators: Vec<String>,
    /// (label, 1-based line number)
    pub entry_points: Vec<(String, usize)>,
    /// TODO/FIXME style markers, "KIND (line N)"
    pub markers: Vec<String>,
    pub shebang: Option<String>,
    /// Markdown headers, in document order
    pub headers: Vec<String>,
    /// Markdown link targets
    pub links: Vec<String>,
    /// Number of fenced code blocks in a Markdown document
    pub code_fences: usize,
    /// Top-level keys of a JSON or YAML document
    pub top_level_keys: Vec<String>,
    /// Maximum nesting depth of a JSON document
    pub max_depth: usize,
}

impl Facts {
    /// Render the facts as a deterministic one-line summary, or `None`
    /// when nothing noteworthy was found.
    pub fn summary_line(&self) -> Option<String> {
        let mut parts = Vec::new();

        if !self.classes.is_empty() {
            parts.push(format!("classes: {}", self.classes.join(", ")));
        }
        if !self.functions.is_empty() {
            parts.push(format!("functions: {}", self.functions.join(", ")));
        }
        if !self.imports.is_empty() {
            parts.push(format!("imports: {}", self.imports.len()));
        }
        if !self.exports.is_empty() {
            parts.push(format!("exports: {}", self.exports.len()));
        }
        if !self.entry_points.is_empty() {
            let labels: Vec<&str> = self
                .entry_points
                .iter()
                .map(|(label, _)| label.as_str())
                .collect();
            parts.push(format!("entry points: {}", labels.join(", ")));
        }
        if !self.markers.is_empty() {
            parts.push(format!("markers: {}", self.markers.join(", ")));
        }
        if !self.headers.is_empty() {
            parts.push(format!("headers: {}", self.headers.len()));
        }
        if !self.top_level_keys.is_empty() {
            parts.push(format!("keys: {}", self.top_level_keys.join(", ")));
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("[facts] {}", parts.join(" | ")))
        }
    }
}

/// Full analyzer output for one file
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub facts: Facts,
    /// Ranges worth retaining in smart mode, merged and ordered by line
    pub smart: Vec<KeepRange>,
    /// Ranges retained in structure mode: imports, signatures, module docs
    pub structure: Vec<LineRange>,
}

/// Uniform contract over all language analyzers: a line sequence in,
/// facts plus keep-range sets out. Implementations are deterministic and
/// side-effect free.
pub trait Analyzer: Send + Sync {
    fn language(&self) -> Language;

    fn analyze(&self, lines: &[&str]) -> Analysis;
}

/// Compile-time registry mapping a language to its analyzer.
///
/// Unknown extensions resolve to the fallback analyzer, whose smart set is
/// the whole file and whose structure set is empty.
pub fn analyzer_for(language: Language) -> &'static dyn Analyzer {
    use crate::fallback::FallbackAnalyzer;
    use crate::javascript::JavaScriptAnalyzer;
    use crate::markdown::MarkdownAnalyzer;
    use crate::python::PythonAnalyzer;
    use crate::rust_lang::RustAnalyzer;
    use crate::shell::ShellAnalyzer;
    use crate::structured_data::{JsonAnalyzer, YamlAnalyzer};

    static PYTHON: PythonAnalyzer = PythonAnalyzer;
    static JAVASCRIPT: JavaScriptAnalyzer = JavaScriptAnalyzer;
    static RUST: RustAnalyzer = RustAnalyzer;
    static SHELL: ShellAnalyzer = ShellAnalyzer;
    static MARKDOWN: MarkdownAnalyzer = MarkdownAnalyzer;
    static JSON: JsonAnalyzer = JsonAnalyzer;
    static YAML: YamlAnalyzer = YamlAnalyzer;
    static FALLBACK: FallbackAnalyzer = FallbackAnalyzer;

    match language {
        Language::Python => &PYTHON,
        Language::JavaScript | Language::TypeScript => &JAVASCRIPT,
        Language::Rust => &RUST,
        Language::Shell => &SHELL,
        Language::Markdown => &MARKDOWN,
        Language::Json => &JSON,
        Language::Yaml => &YAML,
        Language::Unknown => &FALLBACK,
    }
}

/// Accumulates keep ranges and merges overlapping or adjacent ones,
/// promoting merged spans to the highest participating salience.
#[derive(Debug, Default)]
pub(crate) struct RangeBuilder {
    ranges: Vec<KeepRange>,
}

impl RangeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_line(&mut self, line: usize, salience: u8) {
        self.keep_span(line, line + 1, salience);
    }

    pub fn keep_span(&mut self, start: usize, end: usize, salience: u8) {
        if end > start {
            self.ranges.push(KeepRange {
                range: LineRange::new(start, end),
                salience,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn into_merged(mut self) -> Vec<KeepRange> {
        self.ranges
            .sort_by_key(|r| (r.range.start, r.range.end));
        let mut merged: Vec<KeepRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges {
            match merged.last_mut() {
                Some(prev) if range.range.start <= prev.range.end => {
                    prev.range.end = prev.range.end.max(range.range.end);
                    prev.salience = prev.salience.max(range.salience);
                }
                _ => merged.push(range),
            }
        }
        merged
    }
}

/// Shared TODO/FIXME marker scan used by the code analyzers
pub(crate) fn scan_markers(lines: &[&str], facts: &mut Facts) {
    for (i, line) in lines.iter().enumerate() {
        for kind in ["TODO", "FIXME"] {
            if line.contains(kind) {
                facts.markers.push(format!("{kind} (line {})", i + 1));
            }
        }
    }
}
