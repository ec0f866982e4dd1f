//! Re-parsing the emitter's own output reconstructs the emitted file set.

use contextpack_core::{content_digest, pack, PackOptions};
use std::fs;

/// Minimal consumer-side parser for the framing format.
fn parse_records(output: &str) -> Vec<(String, String, String)> {
    let mut records = Vec::new();
    let mut lines = output.lines();

    while let Some(line) = lines.next() {
        let Some(rest) = line.strip_prefix("++++++++++ ") else {
            panic!("expected start marker, got: {line}");
        };
        let path = rest
            .strip_suffix(" ++++++++++")
            .expect("start marker suffix")
            .to_string();

        let mut content = String::new();
        let mut digest = String::new();
        for body_line in lines.by_ref() {
            if let Some(tail) = body_line.strip_prefix("---------- ") {
                let tokens: Vec<&str> = tail
                    .strip_suffix(" ----------")
                    .expect("end marker suffix")
                    .split(' ')
                    .collect();
                assert_eq!(tokens.len(), 3, "untruncated end marker has three tokens");
                assert_eq!(tokens[0], path);
                assert_eq!(tokens[2], path);
                digest = tokens[1].to_string();
                break;
            }
            content.push_str(body_line);
            content.push('\n');
        }
        records.push((path, content, digest));
    }
    records
}

#[test]
fn output_reparses_to_the_emitted_file_set() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}\n").unwrap();
    fs::write(dir.path().join("src/util.rs"), "pub fn u() -> u8 {\n    7\n}\n").unwrap();
    fs::write(dir.path().join("README.md"), "# demo\n\nwords\n").unwrap();

    let mut sink = Vec::new();
    pack(dir.path(), &PackOptions::default(), &mut sink).unwrap();
    let output = String::from_utf8(sink).unwrap();

    let records = parse_records(&output);
    let paths: Vec<&str> = records.iter().map(|(p, _, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "src/lib.rs", "src/util.rs"]);

    for (path, content, digest) in &records {
        // Without truncation the received content hashes to the marker
        // digest, proving integrity end to end.
        assert_eq!(
            &content_digest(content),
            digest,
            "digest mismatch for {path}"
        );
        let on_disk = fs::read_to_string(dir.path().join(path)).unwrap();
        assert_eq!(content, &on_disk);
    }
}

#[test]
fn digest_mismatch_reveals_truncation_to_consumers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("m.py"),
        "import os\nclass A:\n    def f(self, x):\n        return x + 1\n",
    )
    .unwrap();

    let options = PackOptions {
        truncate_mode: Some(contextpack_core::TruncateMode::Structure),
        ..Default::default()
    };
    let mut sink = Vec::new();
    pack(dir.path(), &options, &mut sink).unwrap();
    let output = String::from_utf8(sink).unwrap();

    // The end marker hash covers the original bytes, so recomputing over
    // the received (truncated) content must not match.
    let received: String = output
        .lines()
        .filter(|l| !l.starts_with("++++++++++") && !l.starts_with("----------"))
        .map(|l| format!("{l}\n"))
        .collect();
    let marker_digest = output
        .lines()
        .find(|l| l.starts_with("----------"))
        .and_then(|l| l.split(' ').nth(3))
        .unwrap()
        .to_string();

    assert_ne!(content_digest(&received), marker_digest);
    assert_eq!(
        marker_digest,
        content_digest("import os\nclass A:\n    def f(self, x):\n        return x + 1\n")
    );
}
