use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default ceiling for file sizes considered for serialization (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// How much of a file the binary sniffer inspects
const SNIFF_LEN: usize = 1024;

/// Why a file was rejected before its content entered the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// First kilobyte contains a zero byte
    Binary,
    /// Declared size exceeds the configured ceiling
    Oversize,
    /// The file could not be read
    Unreadable,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Binary => "likely binary",
            SkipReason::Oversize => "file too large",
            SkipReason::Unreadable => "unreadable",
        }
    }
}

/// Whether a content prefix marks the file as binary.
///
/// The heuristic is a zero byte in the first kilobyte; text encodings the
/// pipeline accepts never produce one.
pub fn is_binary_prefix(prefix: &[u8]) -> bool {
    prefix[..prefix.len().min(SNIFF_LEN)].contains(&0)
}

/// Inspect a file on disk without reading more than the sniff window
pub fn sniff(path: &Path, size: u64, max_file_size: u64) -> Option<SkipReason> {
    if size > max_file_size {
        return Some(SkipReason::Oversize);
    }

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Some(SkipReason::Unreadable),
    };
    let mut prefix = [0u8; SNIFF_LEN];
    let mut filled = 0;
    // A single read may return short; keep filling until EOF or the window
    // is full so the zero-byte check always sees the first kilobyte.
    loop {
        match file.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if filled == SNIFF_LEN {
                    break;
                }
            }
            Err(_) => return Some(SkipReason::Unreadable),
        }
    }

    if is_binary_prefix(&prefix[..filled]) {
        return Some(SkipReason::Binary);
    }
    None
}

/// Decode raw bytes to text: UTF-8 first, then an 8-bit pass-through
/// (Latin-1) fallback. A leading UTF-8 BOM is stripped.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
