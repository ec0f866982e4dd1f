use crate::analysis::{
    scan_markers, Analysis, Analyzer, Facts, RangeBuilder, SALIENCE_DOC, SALIENCE_ENTRY,
    SALIENCE_IMPORT, SALIENCE_SIGNATURE,
};
use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

fn fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:unsafe\s+)?(async\s+)?fn\s+([A-Za-z_]\w*)")
            .unwrap()
    })
}

fn type_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(struct|enum|trait|union)\s+([A-Za-z_]\w*)")
            .unwrap()
    })
}

fn impl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*impl\s*(?:<[^>]*>)?\s*(?:([A-Za-z_][\w:]*)\s+for\s+)?([A-Za-z_][\w:]*)")
            .unwrap()
    })
}

fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(mod|type|const|static|macro_rules!)\s+([A-Za-z_]\w*)")
            .unwrap()
    })
}

/// Structural analyzer for Rust sources.
///
/// Tracks brace depth line by line to separate signatures from bodies:
/// `use` paths, type declarations (with their field/variant bodies), trait
/// declarations, `impl` headers and the function signatures inside them are
/// kept; function bodies are not. `fn main` is an entry point and its whole
/// body is retained in smart mode.
pub struct RustAnalyzer;

impl RustAnalyzer {
    fn brace_delta(line: &str) -> i32 {
        line.matches('{').count() as i32 - line.matches('}').count() as i32
    }

    /// End (exclusive) of the block whose opening brace is on or after
    /// `start`. Falls back to a single line when no brace opens in reach.
    fn block_end(lines: &[&str], start: usize) -> usize {
        let mut depth = 0i32;
        let mut opened = false;
        for (i, line) in lines.iter().enumerate().skip(start) {
            depth += Self::brace_delta(line);
            if line.contains('{') {
                opened = true;
            }
            if !opened && line.trim_end().ends_with(';') {
                return i + 1;
            }
            if opened && depth <= 0 {
                return i + 1;
            }
        }
        lines.len()
    }

    /// End (exclusive) of a function signature: up to the line that opens
    /// the body or terminates the declaration.
    fn signature_end(lines: &[&str], start: usize) -> usize {
        let cap = (start + 8).min(lines.len());
        for i in start..cap {
            let t = lines[i].trim_end();
            if t.contains('{') || t.ends_with(';') {
                return i + 1;
            }
        }
        start + 1
    }
}

impl Analyzer for RustAnalyzer {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();

        let mut depth = 0i32;
        let mut attr_start: Option<usize> = None;
        let mut doc_start: Option<usize> = None;
        let mut inside_impl_or_trait = false;
        let mut enclosing_end = 0usize;

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim_start();

            if i >= enclosing_end {
                inside_impl_or_trait = false;
            }

            // Module-level docs.
            if trimmed.starts_with("//!") && depth == 0 {
                smart.keep_line(i, SALIENCE_DOC);
                structure.keep_line(i, SALIENCE_DOC);
                i += 1;
                continue;
            }

            if trimmed.starts_with("///") {
                doc_start.get_or_insert(i);
                i += 1;
                continue;
            }

            if trimmed.starts_with("#[") || trimmed.starts_with("#![") {
                if let Some(name) = trimmed
                    .trim_start_matches("#![")
                    .trim_start_matches("#[")
                    .split(['(', ']'])
                    .next()
                {
                    if !name.is_empty() {
                        facts.decorators.push(name.to_string());
                    }
                }
                attr_start.get_or_insert(i);
                i += 1;
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with("//") {
                attr_start = None;
                doc_start = None;
                i += 1;
                continue;
            }

            let prefix_start = |i: usize, attr: Option<usize>, doc: Option<usize>| {
                attr.into_iter().chain(doc).chain([i]).min().unwrap_or(i)
            };

            if depth == 0 && (trimmed.starts_with("use ") || trimmed.starts_with("extern crate ")) {
                facts
                    .imports
                    .push(trimmed.trim_end_matches(';').to_string());
                smart.keep_line(i, SALIENCE_IMPORT);
                structure.keep_line(i, SALIENCE_IMPORT);
                attr_start = None;
                doc_start = None;
                i += 1;
                continue;
            }

            if depth == 0 {
                if let Some(caps) = type_decl_re().captures(line) {
                    facts.classes.push(caps[2].to_string());
                    let start = prefix_start(i, attr_start.take(), doc_start.take());
                    let end = Self::block_end(lines, i);
                    // Fields and variants are part of the type declaration;
                    // trait bodies carry the method signatures.
                    smart.keep_span(start, end, SALIENCE_SIGNATURE);
                    structure.keep_span(start, end, SALIENCE_SIGNATURE);
                    depth += lines[i..end].iter().map(|l| Self::brace_delta(l)).sum::<i32>();
                    i = end;
                    continue;
                }

                if impl_re().is_match(line) && (trimmed.starts_with("impl ") || trimmed.starts_with("impl<")) {
                    let header_end = Self::signature_end(lines, i);
                    let start = prefix_start(i, attr_start.take(), doc_start.take());
                    smart.keep_span(start, header_end, SALIENCE_SIGNATURE);
                    structure.keep_span(start, header_end, SALIENCE_SIGNATURE);
                    inside_impl_or_trait = true;
                    enclosing_end = Self::block_end(lines, i);
                    depth += lines[i..header_end]
                        .iter()
                        .map(|l| Self::brace_delta(l))
                        .sum::<i32>();
                    i = header_end;
                    continue;
                }

                if let Some(caps) = item_re().captures(line) {
                    facts.functions.push(caps[2].to_string());
                    // mod/type/const/static declarations read as one unit.
                    let start = prefix_start(i, attr_start.take(), doc_start.take());
                    let end = Self::signature_end(lines, i);
                    smart.keep_span(start, end, SALIENCE_SIGNATURE);
                    structure.keep_span(start, end, SALIENCE_SIGNATURE);
                    depth += lines[i..end].iter().map(|l| Self::brace_delta(l)).sum::<i32>();
                    i = end;
                    continue;
                }
            }

            if let Some(caps) = fn_re().captures(line) {
                if depth == 0 || inside_impl_or_trait {
                    let is_async = caps.get(1).is_some();
                    let name = caps[2].to_string();
                    if name == "main" && depth == 0 {
                        facts.entry_points.push(("fn main".to_string(), i + 1));
                        let start = prefix_start(i, attr_start.take(), doc_start.take());
                        let end = Self::block_end(lines, i);
                        smart.keep_span(start, end, SALIENCE_ENTRY);
                        let sig_end = Self::signature_end(lines, i);
                        structure.keep_span(start, sig_end, SALIENCE_SIGNATURE);
                        facts.functions.push(name);
                        depth += lines[i..end].iter().map(|l| Self::brace_delta(l)).sum::<i32>();
                        i = end;
                        continue;
                    }

                    facts
                        .functions
                        .push(if is_async { format!("async {name}") } else { name });
                    let start = prefix_start(i, attr_start.take(), doc_start.take());
                    let sig_end = Self::signature_end(lines, i);
                    smart.keep_span(start, sig_end, SALIENCE_SIGNATURE);
                    structure.keep_span(start, sig_end, SALIENCE_SIGNATURE);
                    let body_end = Self::block_end(lines, i);
                    depth += lines[i..sig_end].iter().map(|l| Self::brace_delta(l)).sum::<i32>();
                    // Skip the body without keeping it.
                    if body_end > sig_end {
                        depth += lines[sig_end..body_end]
                            .iter()
                            .map(|l| Self::brace_delta(l))
                            .sum::<i32>();
                        i = body_end;
                    } else {
                        i = sig_end;
                    }
                    continue;
                }
            }

            depth += Self::brace_delta(line);
            attr_start = None;
            doc_start = None;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Analysis {
        let lines: Vec<&str> = src.lines().collect();
        RustAnalyzer.analyze(&lines)
    }

    fn structure_lines<'a>(src: &'a str, analysis: &Analysis) -> Vec<&'a str> {
        let lines: Vec<&str> = src.lines().collect();
        analysis
            .structure
            .iter()
            .flat_map(|r| lines[r.start..r.end].to_vec())
            .collect()
    }

    const SAMPLE: &str = r#"use std::collections::HashMap;

/// A point.
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

fn main() {
    println!("hi");
}
"#;

    #[test]
    fn facts_cover_types_functions_imports_entry() {
        let analysis = analyze(SAMPLE);
        assert_eq!(analysis.facts.classes, vec!["Point"]);
        assert!(analysis.facts.functions.contains(&"new".to_string()));
        assert_eq!(analysis.facts.imports, vec!["use std::collections::HashMap"]);
        assert_eq!(analysis.facts.entry_points, vec![("fn main".to_string(), 15)]);
    }

    #[test]
    fn structure_keeps_struct_body_but_not_fn_body() {
        let analysis = analyze(SAMPLE);
        let kept = structure_lines(SAMPLE, &analysis);
        assert!(kept.contains(&"use std::collections::HashMap;"));
        assert!(kept.contains(&"pub struct Point {"));
        assert!(kept.contains(&"    x: i32,"));
        assert!(kept.contains(&"    pub fn new(x: i32, y: i32) -> Self {"));
        assert!(!kept.iter().any(|l| l.contains("Self { x, y }")));
        assert!(!kept.iter().any(|l| l.contains("println!")));
    }

    #[test]
    fn main_body_is_kept_in_smart_mode() {
        let analysis = analyze(SAMPLE);
        let main_range = analysis
            .smart
            .iter()
            .find(|k| k.salience == SALIENCE_ENTRY)
            .expect("main range");
        // fn main spans lines 14..17 (0-based).
        assert_eq!(main_range.range.start, 14);
        assert_eq!(main_range.range.end, 17);
    }

    #[test]
    fn async_fn_and_traits_are_recognized() {
        let src = "pub trait Runner {\n    fn run(&self);\n}\n\npub async fn serve() {\n    loop {}\n}\n";
        let analysis = analyze(src);
        assert_eq!(analysis.facts.classes, vec!["Runner"]);
        assert!(analysis.facts.functions.contains(&"async serve".to_string()));
        let kept = structure_lines(src, &analysis);
        assert!(kept.contains(&"    fn run(&self);"));
        assert!(!kept.iter().any(|l| l.contains("loop")));
    }

    #[test]
    fn attributes_prefix_their_item() {
        let src = "#[derive(Debug)]\npub struct S {\n    v: u8,\n}\n";
        let analysis = analyze(src);
        assert_eq!(analysis.facts.decorators, vec!["derive"]);
        assert_eq!(analysis.structure[0].start, 0);
    }

    #[test]
    fn module_docs_are_kept() {
        let src = "//! Crate docs.\n\nuse std::fmt;\n";
        let analysis = analyze(src);
        let kept = structure_lines(src, &analysis);
        assert!(kept.contains(&"//! Crate docs."));
        assert!(kept.contains(&"use std::fmt;"));
    }
}
