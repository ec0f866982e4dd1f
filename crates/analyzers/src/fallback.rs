use crate::analysis::{Analysis, Analyzer, Facts, KeepRange, LineRange, SALIENCE_CONTEXT};
use crate::language::Language;

/// Degenerate analyzer for unrecognized extensions.
///
/// Its smart keep-range is the whole file; its structure set is empty,
/// which makes the truncator degrade structure mode to smart.
pub struct FallbackAnalyzer;

impl Analyzer for FallbackAnalyzer {
    fn language(&self) -> Language {
        Language::Unknown
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let smart = if lines.is_empty() {
            Vec::new()
        } else {
            vec![KeepRange {
                range: LineRange::new(0, lines.len()),
                salience: SALIENCE_CONTEXT,
            }]
        };

        Analysis {
            facts: Facts::default(),
            smart,
            structure: Vec::new(),
        }
    }
}
