use crate::analysis::{
    Analysis, Analyzer, Facts, RangeBuilder, SALIENCE_DOC, SALIENCE_SIGNATURE,
};
use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

fn json_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*"([^"]+)"\s*:"#).unwrap())
}

fn yaml_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^([A-Za-z0-9_."'-]+)\s*:"#).unwrap())
}

/// Structural analyzer for JSON documents: top-level keys and nesting
/// depth, tracked with a line-oriented brace counter that ignores
/// delimiters inside strings.
pub struct JsonAnalyzer;

impl JsonAnalyzer {
    /// Net depth change of one line, skipping string contents
    fn scan_line(line: &str, depth_in: usize, max_depth: &mut usize) -> usize {
        let mut depth = depth_in;
        let mut in_string = false;
        let mut escaped = false;
        for c in line.chars() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' if in_string => escaped = true,
                '"' => in_string = !in_string,
                '{' | '[' if !in_string => {
                    depth += 1;
                    *max_depth = (*max_depth).max(depth);
                }
                '}' | ']' if !in_string => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        depth
    }
}

impl Analyzer for JsonAnalyzer {
    fn language(&self) -> Language {
        Language::Json
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();
        let mut depth = 0usize;

        for (i, line) in lines.iter().enumerate() {
            let depth_at_start = depth;
            depth = Self::scan_line(line, depth, &mut facts.max_depth);

            if depth_at_start <= 1 && !line.trim().is_empty() {
                smart.keep_line(i, SALIENCE_SIGNATURE);
                structure.keep_line(i, SALIENCE_SIGNATURE);
                if depth_at_start == 1 {
                    if let Some(caps) = json_key_re().captures(line) {
                        facts.top_level_keys.push(caps[1].to_string());
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

/// Structural analyzer for YAML documents: unindented keys and document
/// markers.
pub struct YamlAnalyzer;

impl Analyzer for YamlAnalyzer {
    fn language(&self) -> Language {
        Language::Yaml
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();

        for (i, line) in lines.iter().enumerate() {
            if line.starts_with("---") {
                smart.keep_line(i, SALIENCE_DOC);
                structure.keep_line(i, SALIENCE_DOC);
                continue;
            }
            if let Some(caps) = yaml_key_re().captures(line) {
                facts.top_level_keys.push(caps[1].to_string());
                smart.keep_line(i, SALIENCE_SIGNATURE);
                structure.keep_line(i, SALIENCE_SIGNATURE);
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
