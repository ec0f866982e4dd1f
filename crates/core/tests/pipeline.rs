//! End-to-end pipeline behavior over real directory trees.

use contextpack_core::{
    content_digest, pack, LensConfig, PackConfig, PackOptions, PriorityGroup, PriorityStore,
    SortKey, SortOrder, Strategy, TruncateMode,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

fn run(root: &Path, options: &PackOptions) -> String {
    let mut sink = Vec::new();
    pack(root, options, &mut sink).expect("pack succeeds");
    String::from_utf8(sink).expect("output is UTF-8")
}

fn priority_lens(groups: &[(&str, i64)]) -> PackConfig {
    let mut lenses = HashMap::new();
    lenses.insert(
        "prio".to_string(),
        LensConfig {
            description: "test priorities".to_string(),
            groups: groups
                .iter()
                .map(|(pattern, priority)| PriorityGroup {
                    pattern: pattern.to_string(),
                    priority: *priority,
                    truncate_mode: None,
                    truncate: None,
                    always_include: false,
                })
                .collect(),
            ..Default::default()
        },
    );
    PackConfig {
        lenses,
        ..Default::default()
    }
}

#[test]
fn framing_scenario_is_byte_exact() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hello.txt"), "hi\n").unwrap();

    let output = run(dir.path(), &PackOptions::default());
    assert_eq!(
        output,
        "++++++++++ hello.txt ++++++++++\nhi\n---------- hello.txt b1946ac92492d2347c6235b4d2611184 hello.txt ----------\n"
    );
}

#[test]
fn structure_scenario_keeps_signatures_and_hashes_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let original = "import os\nclass A:\n    def f(self, x):\n        return x + 1\n";
    fs::write(dir.path().join("m.py"), original).unwrap();

    let options = PackOptions {
        lens: Some("architecture".to_string()),
        truncate_mode: Some(TruncateMode::Structure),
        ..Default::default()
    };
    let output = run(dir.path(), &options);

    let digest = content_digest(original);
    let expected = format!(
        "++++++++++ m.py [TRUNCATED: 4 lines] ++++++++++\n\
         import os\nclass A:\n    def f(self, x):\n\
         ---------- m.py [TRUNCATED:4\u{2192}3] {digest} m.py ----------\n"
    );
    assert_eq!(output, expected);
}

#[test]
fn budget_drop_scenario_selects_by_priority() {
    let dir = tempfile::tempdir().unwrap();
    // Full costs 80, 60, 40 tokens at priorities 90, 50, 70.
    fs::write(dir.path().join("a.txt"), "x".repeat(320)).unwrap();
    fs::write(dir.path().join("b.txt"), "y".repeat(240)).unwrap();
    fs::write(dir.path().join("c.txt"), "z".repeat(160)).unwrap();

    let options = PackOptions {
        lens: Some("prio".to_string()),
        config: priority_lens(&[("a.txt", 90), ("b.txt", 50), ("c.txt", 70)]),
        budget: Some(100),
        strategy: Strategy::Drop,
        ..Default::default()
    };
    let mut sink = Vec::new();
    let summary = pack(dir.path(), &options, &mut sink).unwrap();
    let output = String::from_utf8(sink).unwrap();

    assert!(output.contains("++++++++++ a.txt ++++++++++"));
    assert!(!output.contains("b.txt"));
    assert!(!output.contains("c.txt"));

    let report = summary.report.expect("budget report");
    assert_eq!(report.used, 80);
    assert!(report.used <= report.budget);
}

#[test]
fn hybrid_scenario_structures_the_large_file() {
    let dir = tempfile::tempdir().unwrap();
    // A Python file well over 10% of the budget with a much cheaper
    // structure rendition, plus a small plain file.
    let mut large = String::from("import os\n");
    for i in 0..60 {
        large.push_str(&format!(
            "def handler_{i}(request):\n    value = {i}\n    return value * 2\n"
        ));
    }
    fs::write(dir.path().join("large.py"), &large).unwrap();
    fs::write(dir.path().join("small.txt"), "tiny file\n").unwrap();

    let options = PackOptions {
        budget: Some(1000),
        strategy: Strategy::Hybrid,
        ..Default::default()
    };
    let mut sink = Vec::new();
    let summary = pack(dir.path(), &options, &mut sink).unwrap();
    let output = String::from_utf8(sink).unwrap();

    assert!(output.contains("++++++++++ large.py [TRUNCATED:"));
    assert!(output.contains("++++++++++ small.txt ++++++++++"));
    assert!(!output.contains("value * 2"));

    let report = summary.report.unwrap();
    assert!(report.used <= report.budget);
}

#[test]
fn streaming_emits_in_traversal_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a/x.txt"), "first\n").unwrap();
    fs::write(dir.path().join("b/y.txt"), "second\n").unwrap();

    let options = PackOptions {
        lens: Some("prio".to_string()),
        config: priority_lens(&[("a/x.txt", 10), ("b/y.txt", 90)]),
        streaming: true,
        ..Default::default()
    };
    let output = run(dir.path(), &options);

    let x = output.find("++++++++++ a/x.txt").expect("a/x.txt present");
    let y = output.find("++++++++++ b/y.txt").expect("b/y.txt present");
    assert!(x < y, "traversal order must win in streaming mode");
}

#[test]
fn batch_sorting_respects_priority_over_name_on_ties() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a\n").unwrap();
    fs::write(dir.path().join("b.txt"), "b\n").unwrap();

    // Same mtimes are likely; sort by name descending to check ordering.
    let options = PackOptions {
        sort_by: Some(SortKey::Name),
        sort_order: Some(SortOrder::Desc),
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    let a = output.find("++++++++++ a.txt").unwrap();
    let b = output.find("++++++++++ b.txt").unwrap();
    assert!(b < a);
}

#[test]
fn identical_runs_produce_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}\n").unwrap();
    fs::write(dir.path().join("README.md"), "# demo\n").unwrap();

    let options = PackOptions {
        emit_meta: true,
        ..Default::default()
    };
    let first = run(dir.path(), &options);
    let second = run(dir.path(), &options);
    assert_eq!(first, second);
    assert!(first.contains(".contextpack_meta"));
}

#[test]
fn empty_repository_emits_zero_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &PackOptions::default());
    assert!(output.is_empty());

    // Even with the meta record requested.
    let options = PackOptions {
        emit_meta: true,
        ..Default::default()
    };
    assert!(run(dir.path(), &options).is_empty());
}

#[test]
fn include_set_with_no_matches_is_empty_and_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.py"), "x = 1\n").unwrap();

    let options = PackOptions {
        include: vec!["*.rs".to_string()],
        ..Default::default()
    };
    assert!(run(dir.path(), &options).is_empty());
}

#[test]
fn unmatched_new_file_changes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keep.rs"), "pub fn k() {}\n").unwrap();

    let options = PackOptions {
        include: vec!["*.rs".to_string()],
        ..Default::default()
    };
    let before = run(dir.path(), &options);
    fs::write(dir.path().join("ignored.py"), "x = 1\n").unwrap();
    let after = run(dir.path(), &options);
    assert_eq!(before, after);
}

#[test]
fn binary_content_never_reaches_the_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("blob.dat"), b"PK\x03\x04\x00payload").unwrap();
    fs::write(dir.path().join("ok.txt"), "text\n").unwrap();

    let output = run(dir.path(), &PackOptions::default());
    assert!(!output.contains("blob.dat"));
    assert!(!output.contains("payload"));
    assert!(output.contains("ok.txt"));
}

#[test]
fn size_ceiling_is_a_sharp_boundary() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("at.txt"), "x".repeat(64)).unwrap();
    fs::write(dir.path().join("over.txt"), "x".repeat(65)).unwrap();

    let options = PackOptions {
        max_file_size: 64,
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    assert!(output.contains("at.txt"));
    assert!(!output.contains("over.txt"));
}

#[test]
fn missing_trailing_newline_is_injected_but_not_hashed() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("raw.txt"), "abc").unwrap();

    let output = run(dir.path(), &PackOptions::default());
    let digest = content_digest("abc");
    assert_eq!(
        output,
        format!("++++++++++ raw.txt ++++++++++\nabc\n---------- raw.txt {digest} raw.txt ----------\n")
    );
}

#[test]
fn bom_only_file_is_empty_text() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bom.txt"), [0xEFu8, 0xBB, 0xBF]).unwrap();

    let output = run(dir.path(), &PackOptions::default());
    let digest = content_digest("");
    assert_eq!(
        output,
        format!("++++++++++ bom.txt ++++++++++\n\n---------- bom.txt {digest} bom.txt ----------\n")
    );
}

#[test]
fn smart_mode_emissions_retain_every_import() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = String::from("import os\nimport sys\nfrom json import loads\n");
    for i in 0..100 {
        source.push_str(&format!("def f{i}():\n    return {i}\n"));
    }
    fs::write(dir.path().join("mod.py"), &source).unwrap();

    let options = PackOptions {
        truncate_mode: Some(TruncateMode::Smart),
        truncate_lines: Some(10),
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    assert!(output.contains("import os\n"));
    assert!(output.contains("import sys\n"));
    assert!(output.contains("from json import loads\n"));
}

#[test]
fn priority_floor_drops_files_outright() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("low.txt"), "low\n").unwrap();
    fs::write(dir.path().join("high.txt"), "high\n").unwrap();

    let options = PackOptions {
        lens: Some("prio".to_string()),
        config: priority_lens(&[("low.txt", 5), ("high.txt", 95)]),
        priority_floor: Some(10),
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    assert!(!output.contains("low.txt"));
    assert!(output.contains("high.txt"));
}

#[test]
fn store_always_include_bypasses_a_tight_budget() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("pinned.txt"), "p".repeat(400)).unwrap();

    let store: PriorityStore = serde_json::from_str(
        r#"{"files": {"pinned.txt": {"utility": 0.1, "tags": ["always_include"]}}}"#,
    )
    .unwrap();

    let options = PackOptions {
        budget: Some(10),
        strategy: Strategy::Drop,
        store: Some(store),
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    assert!(output.contains("pinned.txt"));
}

#[test]
fn learned_utility_reorders_equal_static_priorities() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cold.txt"), "c".repeat(200)).unwrap();
    fs::write(dir.path().join("hot.txt"), "h".repeat(200)).unwrap();

    let store: PriorityStore =
        serde_json::from_str(r#"{"files": {"hot.txt": {"utility": 1.0}}}"#).unwrap();

    // Budget fits exactly one 50-token file.
    let options = PackOptions {
        budget: Some(50),
        strategy: Strategy::Drop,
        store: Some(store),
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    assert!(output.contains("hot.txt"));
    assert!(!output.contains("cold.txt"));
}

#[test]
fn meta_record_is_first_and_framed() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("z.txt"), "zz\n").unwrap();

    let options = PackOptions {
        lens: Some("debug".to_string()),
        emit_meta: true,
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    assert!(output.starts_with("++++++++++ .contextpack_meta ++++++++++\n"));
    assert!(output.contains("lens: debug\n"));
    assert!(output.contains("generated: "));
}

#[test]
fn group_truncation_override_applies_per_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("svc.py"),
        "import os\ndef f():\n    return 1\n",
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "keep\nall\nlines\n").unwrap();

    let mut lenses = HashMap::new();
    lenses.insert(
        "mixed".to_string(),
        LensConfig {
            groups: vec![PriorityGroup {
                pattern: "*.py".to_string(),
                priority: 80,
                truncate_mode: Some(TruncateMode::Structure),
                truncate: None,
                always_include: false,
            }],
            ..Default::default()
        },
    );
    let options = PackOptions {
        lens: Some("mixed".to_string()),
        config: PackConfig {
            lenses,
            ..Default::default()
        },
        ..Default::default()
    };
    let output = run(dir.path(), &options);
    // The python file is structured; the text file is untouched.
    assert!(output.contains("++++++++++ svc.py [TRUNCATED:"));
    assert!(!output.contains("return 1"));
    assert!(output.contains("keep\nall\nlines\n"));
}
