use std::io::{self, Write};

/// MD5 of content, lowercase hex.
///
/// Always computed over the original decoded content, never the
/// truncated rendition, so a consumer can detect truncation by digest
/// mismatch against what they received.
pub fn content_digest(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

/// One record ready for framing
#[derive(Debug, Clone)]
pub struct EmissionRecord<'a> {
    pub rel_path: &'a str,
    /// Possibly-truncated content
    pub content: &'a str,
    /// Digest of the original content
    pub digest: &'a str,
    pub original_lines: usize,
    pub final_lines: usize,
    pub truncated: bool,
}

/// Write one framed record, byte-exact:
///
/// ```text
/// ++++++++++ <path> [TRUNCATED: <orig> lines] ++++++++++
/// <content, always ending in a newline>
/// ---------- <path> [TRUNCATED:<orig>→<final>] <md5> <path> ----------
/// ```
///
/// The `[TRUNCATED …]` annotations appear only when truncation occurred.
pub fn write_record<W: Write>(out: &mut W, record: &EmissionRecord<'_>) -> io::Result<()> {
    if record.truncated {
        writeln!(
            out,
            "++++++++++ {} [TRUNCATED: {} lines] ++++++++++",
            record.rel_path, record.original_lines
        )?;
    } else {
        writeln!(out, "++++++++++ {} ++++++++++", record.rel_path)?;
    }

    out.write_all(record.content.as_bytes())?;
    if !record.content.ends_with('\n') {
        out.write_all(b"\n")?;
    }

    if record.truncated {
        writeln!(
            out,
            "---------- {} [TRUNCATED:{}\u{2192}{}] {} {} ----------",
            record.rel_path,
            record.original_lines,
            record.final_lines,
            record.digest,
            record.rel_path
        )?;
    } else {
        writeln!(
            out,
            "---------- {} {} {} ----------",
            record.rel_path, record.digest, record.rel_path
        )?;
    }

    Ok(())
}

/// Render one framed record to a string; the emitter buffers one file at
/// a time so a dropped consumer never sees a half-written record.
pub fn render_record(record: &EmissionRecord<'_>) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    write_record(&mut buffer, record).expect("in-memory write");
    String::from_utf8(buffer).expect("frame output is UTF-8")
}
