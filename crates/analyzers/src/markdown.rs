use crate::analysis::{
    Analysis, Analyzer, Facts, RangeBuilder, SALIENCE_DOC, SALIENCE_SIGNATURE,
};
use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").unwrap())
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]\(([^)]+)\)").unwrap())
}

/// Structural analyzer for Markdown documents: headers, fenced code
/// blocks, and link targets.
pub struct MarkdownAnalyzer;

impl Analyzer for MarkdownAnalyzer {
    fn language(&self) -> Language {
        Language::Markdown
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();
        let mut fence_open = false;

        for (i, line) in lines.iter().enumerate() {
            if line.trim_start().starts_with("```") {
                if !fence_open {
                    facts.code_fences += 1;
                }
                fence_open = !fence_open;
                continue;
            }
            if fence_open {
                continue;
            }

            for caps in link_re().captures_iter(line) {
                facts.links.push(caps[1].to_string());
            }

            if let Some(caps) = header_re().captures(line) {
                facts.headers.push(caps[2].to_string());
                smart.keep_line(i, SALIENCE_SIGNATURE);
                structure.keep_line(i, SALIENCE_SIGNATURE);
                // Keep the first following prose line for context.
                if let Some(next) = lines.get(i + 1) {
                    if !next.trim().is_empty() && !next.trim_start().starts_with('#') {
                        smart.keep_line(i + 1, SALIENCE_DOC);
                    }
                }
            }
        }

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
