use crate::analysis::{
    scan_markers, Analysis, Analyzer, Facts, RangeBuilder, SALIENCE_DOC, SALIENCE_ENTRY,
    SALIENCE_IMPORT, SALIENCE_SIGNATURE,
};
use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)")
            .unwrap()
    })
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)?")
            .unwrap()
    })
}

fn arrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)[^=]*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
        )
        .unwrap()
    })
}

fn interface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:export\s+)?interface\s+([A-Za-z_$][\w$]*)").unwrap())
}

fn type_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)\s*=").unwrap())
}

/// Structural analyzer for JavaScript and TypeScript sources.
///
/// Covers classes, function declarations, arrow-function bindings,
/// import/export statements, interfaces and type aliases, decorators, and
/// JSDoc blocks adjacent to declarations.
pub struct JavaScriptAnalyzer;

impl JavaScriptAnalyzer {
    fn is_import(trimmed: &str) -> bool {
        trimmed.starts_with("import ")
            || trimmed.starts_with("import{")
            || trimmed.starts_with("import(")
            || (trimmed.contains("require(")
                && (trimmed.starts_with("const ")
                    || trimmed.starts_with("let ")
                    || trimmed.starts_with("var ")))
    }

    /// End (exclusive) of a JSDoc block starting at `start`, if one does
    fn jsdoc_end(lines: &[&str], start: usize) -> Option<usize> {
        if !lines.get(start)?.trim_start().starts_with("/**") {
            return None;
        }
        let cap = (start + 30).min(lines.len());
        for (i, line) in lines.iter().enumerate().take(cap).skip(start) {
            if line.contains("*/") {
                return Some(i + 1);
            }
        }
        Some(cap)
    }

    /// End (exclusive) of a declaration header that may span lines
    fn signature_end(lines: &[&str], start: usize) -> usize {
        let cap = (start + 6).min(lines.len());
        for i in start..cap {
            let t = lines[i].trim_end();
            if t.contains('{') || t.ends_with(';') || t.contains("=>") {
                return i + 1;
            }
        }
        start + 1
    }
}

impl Analyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();
        let mut decorator_start: Option<usize> = None;
        let mut last_jsdoc: Option<(usize, usize)> = None;

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim_start();

            if i == 0 && trimmed.starts_with("#!") {
                facts.shebang = Some(trimmed.to_string());
                smart.keep_line(0, SALIENCE_ENTRY);
                structure.keep_line(0, SALIENCE_ENTRY);
                i += 1;
                continue;
            }

            if let Some(end) = Self::jsdoc_end(lines, i) {
                // A JSDoc block at the very top documents the module.
                if i == 0 {
                    structure.keep_span(i, end, SALIENCE_DOC);
                }
                last_jsdoc = Some((i, end));
                i = end;
                continue;
            }

            if trimmed.is_empty() {
                decorator_start = None;
                last_jsdoc = None;
                i += 1;
                continue;
            }

            if Self::is_import(trimmed) {
                facts.imports.push(trimmed.to_string());
                smart.keep_line(i, SALIENCE_IMPORT);
                structure.keep_line(i, SALIENCE_IMPORT);
                i += 1;
                continue;
            }

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

            let mut declared = false;

            if let Some(caps) = class_re().captures(line) {
                facts.classes.push(caps[1].to_string());
                declared = true;
            } else if let Some(caps) = interface_re().captures(line) {
                facts.classes.push(caps[1].to_string());
                declared = true;
            } else if let Some(caps) = type_alias_re().captures(line) {
                facts.classes.push(caps[1].to_string());
                declared = true;
            } else if trimmed.starts_with("function")
                || trimmed.contains("function ")
                || trimmed.contains("function*")
            {
                if let Some(caps) = function_re().captures(line) {
                    if let Some(name) = caps.get(2) {
                        let name = name.as_str().to_string();
                        if name == "main" {
                            facts.entry_points.push(("main".to_string(), i + 1));
                        }
                        facts.functions.push(name);
                    }
                    declared = true;
                }
            } else if let Some(caps) = arrow_re().captures(line) {
                facts.functions.push(caps[1].to_string());
                declared = true;
            }

            if declared {
                if trimmed.starts_with("export") {
                    facts.exports.push(trimmed.to_string());
                }
                let start = decorator_start.take().unwrap_or(i);
                if let Some((doc_start, doc_end)) = last_jsdoc.take() {
                    if doc_end == start {
                        smart.keep_span(doc_start, doc_end, SALIENCE_DOC);
                    }
                }
                let end = Self::signature_end(lines, i);
                smart.keep_span(start, end, SALIENCE_SIGNATURE);
                structure.keep_span(start, end, SALIENCE_SIGNATURE);
                i = end;
                continue;
            }

            if trimmed.starts_with("export ") {
                facts.exports.push(trimmed.to_string());
                smart.keep_line(i, SALIENCE_SIGNATURE);
                structure.keep_line(i, SALIENCE_SIGNATURE);
                i += 1;
                continue;
            }

            if trimmed.starts_with("if (require.main === module)")
                || trimmed.starts_with("if (import.meta.main)")
            {
                facts.entry_points.push(("entry guard".to_string(), i + 1));
                smart.keep_line(i, SALIENCE_ENTRY);
                i += 1;
                continue;
            }

            decorator_start = None;
            last_jsdoc = None;
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
