use crate::analysis::{
    scan_markers, Analysis, Analyzer, Facts, RangeBuilder, SALIENCE_ENTRY, SALIENCE_IMPORT,
    SALIENCE_SIGNATURE,
};
use crate::language::Language;
use regex::Regex;
use std::sync::OnceLock;

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:function\s+([A-Za-z_][\w-]*)|([A-Za-z_][\w-]*)\s*\(\s*\))").unwrap()
    })
}

/// Structural analyzer for shell scripts (sh, bash, zsh, fish).
///
/// Recognizes the shebang, function declarations in both `name()` and
/// `function name` forms, and `source`/`.` statements.
pub struct ShellAnalyzer;

impl Analyzer for ShellAnalyzer {
    fn language(&self) -> Language {
        Language::Shell
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = RangeBuilder::new();
        let mut structure = RangeBuilder::new();

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_start();

            if i == 0 && trimmed.starts_with("#!") {
                facts.shebang = Some(trimmed.to_string());
                smart.keep_line(0, SALIENCE_ENTRY);
                structure.keep_line(0, SALIENCE_ENTRY);
                continue;
            }

            if trimmed.starts_with("source ") || trimmed.starts_with(". ") {
                facts.imports.push(trimmed.to_string());
                smart.keep_line(i, SALIENCE_IMPORT);
                structure.keep_line(i, SALIENCE_IMPORT);
                continue;
            }

            if let Some(caps) = function_re().captures(line) {
                if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                    facts.functions.push(name.as_str().to_string());
                    smart.keep_line(i, SALIENCE_SIGNATURE);
                    structure.keep_line(i, SALIENCE_SIGNATURE);
                }
            }
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
        ShellAnalyzer.analyze(&lines)
    }

    #[test]
    fn shebang_and_sources_are_facts() {
        let src = "#!/usr/bin/env bash\nsource ./lib.sh\n. ./util.sh\necho hi\n";
        let analysis = analyze(src);
        assert_eq!(analysis.facts.shebang.as_deref(), Some("#!/usr/bin/env bash"));
        assert_eq!(analysis.facts.imports.len(), 2);
    }

    #[test]
    fn both_function_forms_are_recognized() {
        let src = "deploy() {\n  echo deploying\n}\nfunction cleanup {\n  rm -rf tmp\n}\n";
        let analysis = analyze(src);
        assert_eq!(analysis.facts.functions, vec!["deploy", "cleanup"]);
    }

    #[test]
    fn structure_keeps_declarations_only() {
        let src = "#!/bin/sh\nhello() {\n  echo hi\n}\n";
        let analysis = analyze(src);
        let kept: Vec<usize> = analysis
            .structure
            .iter()
            .flat_map(|r| r.start..r.end)
            .collect();
        assert_eq!(kept, vec![0, 1]);
    }
}
