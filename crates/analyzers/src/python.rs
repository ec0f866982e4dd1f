use crate::analysis::{
    scan_markers, Analysis, Analyzer, Facts, RangeBuilder, SALIENCE_DOC, SALIENCE_ENTRY,
    SALIENCE_IMPORT, SALIENCE_SIGNATURE,
};
use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*class\s+([A-Za-z_]\w*)").unwrap())
}

fn def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(async\s+)?def\s+([A-Za-z_]\w*)").unwrap())
}

/// Structural analyzer for Python sources.
///
/// Recognizes class and function definitions (including async), imports,
/// decorators, module docstrings, and the `if __name__ == "__main__"`
/// script guard.
pub struct PythonAnalyzer;

impl PythonAnalyzer {
    fn is_import(trimmed: &str) -> bool {
        trimmed.starts_with("import ")
            || (trimmed.starts_with("from ") && trimmed.contains(" import"))
    }

    /// End (exclusive) of a signature that may span lines until the `:`
    fn signature_end(lines: &[&str], start: usize) -> usize {
        let cap = (start + 10).min(lines.len());
        for i in start..cap {
            let t = lines[i].trim_end();
            // The header ends at a trailing colon, or at a colon after
            // the parameter list closes ("def f(): return 1").
            let closed = t.rfind(')').map_or(false, |pos| t[pos..].contains(':'));
            if t.ends_with(':') || closed {
                return i + 1;
            }
        }
        start + 1
    }

    /// End (exclusive) of a docstring starting at `start`, if one starts there
    fn docstring_end(lines: &[&str], start: usize) -> Option<usize> {
        let trimmed = lines.get(start)?.trim_start();
        let quote = if trimmed.starts_with("\"\"\"") {
            "\"\"\""
        } else if trimmed.starts_with("'''") {
            "'''"
        } else {
            return None;
        };

        // Single-line docstring: the closing quote is on the same line.
        let rest = &trimmed[quote.len()..];
        if rest.contains(quote) {
            return Some(start + 1);
        }
        let cap = (start + 30).min(lines.len());
        for (i, line) in lines.iter().enumerate().take(cap).skip(start + 1) {
            if line.contains(quote) {
                return Some(i + 1);
            }
        }
        Some(cap)
    }

    fn indent_of(line: &str) -> usize {
        line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
    }

    /// End (exclusive) of the indented block opened at `guard`
    fn block_end(lines: &[&str], guard: usize) -> usize {
        let base = Self::indent_of(lines[guard]);
        let mut end = guard + 1;
        for (i, line) in lines.iter().enumerate().skip(guard + 1) {
            if line.trim().is_empty() || Self::indent_of(line) > base {
                end = i + 1;
            } else {
                break;
            }
        }
        end
    }
}

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();
        let mut decorator_start: Option<usize> = None;
        let mut saw_code = false;

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim_start();

            if i == 0 && trimmed.starts_with("#!") {
                facts.shebang = Some(trimmed.to_string());
                smart.keep_line(i, SALIENCE_ENTRY);
                structure.keep_line(i, SALIENCE_ENTRY);
                i += 1;
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with('#') {
                decorator_start = None;
                i += 1;
                continue;
            }

            // Module docstring: the first statement of the file.
            if !saw_code {
                if let Some(end) = Self::docstring_end(lines, i) {
                    smart.keep_span(i, end, SALIENCE_DOC);
                    structure.keep_span(i, end, SALIENCE_DOC);
                    saw_code = true;
                    i = end;
                    continue;
                }
            }
            saw_code = true;

            if trimmed.starts_with('@') {
                let name = trimmed
                    .trim_start_matches('@')
                    .split(['(', ' '])
                    .next()
                    .unwrap_or_default();
                if !name.is_empty() {
                    facts.decorators.push(name.to_string());
                }
                decorator_start.get_or_insert(i);
                i += 1;
                continue;
            }

            if Self::is_import(trimmed) {
                facts.imports.push(trimmed.to_string());
                smart.keep_line(i, SALIENCE_IMPORT);
                structure.keep_line(i, SALIENCE_IMPORT);
                decorator_start = None;
                i += 1;
                continue;
            }

            if let Some(caps) = class_re().captures(line) {
                facts.classes.push(caps[1].to_string());
                let start = decorator_start.take().unwrap_or(i);
                let end = Self::signature_end(lines, i);
                smart.keep_span(start, end, SALIENCE_SIGNATURE);
                structure.keep_span(start, end, SALIENCE_SIGNATURE);
                if let Some(doc_end) = Self::docstring_end(lines, end) {
                    smart.keep_span(end, doc_end, SALIENCE_DOC);
                }
                i = end;
                continue;
            }

            if let Some(caps) = def_re().captures(line) {
                let name = caps[2].to_string();
                if name == "main" {
                    facts.entry_points.push(("main".to_string(), i + 1));
                }
                facts.functions.push(name);
                let start = decorator_start.take().unwrap_or(i);
                let end = Self::signature_end(lines, i);
                smart.keep_span(start, end, SALIENCE_SIGNATURE);
                structure.keep_span(start, end, SALIENCE_SIGNATURE);
                if let Some(doc_end) = Self::docstring_end(lines, end) {
                    smart.keep_span(end, doc_end, SALIENCE_DOC);
                }
                i = end;
                continue;
            }

            if trimmed.starts_with("if __name__") {
                facts
                    .entry_points
                    .push(("__main__ guard".to_string(), i + 1));
                let end = Self::block_end(lines, i);
                smart.keep_span(i, end, SALIENCE_ENTRY);
                i = end;
                continue;
            }

            decorator_start = None;
            i += 1;
        }

        scan_markers(lines, &mut facts);

        Analysis {
            facts,
            smart: smart.into_merged(),
            structure: structure
                .into_merged()
                .into_iter()
                .map(|k| k.range)
                .collect(),
        }
    }
}
