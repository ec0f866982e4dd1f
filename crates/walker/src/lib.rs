//! # contextpack-walker
//!
//! Deterministic repository traversal for the contextpack pipeline.
//!
//! The walker enumerates directory entries lexicographically, prunes
//! excluded subtrees before descending, rejects binary and oversize files
//! with a single-kilobyte sniff, and yields immutable [`FileDescriptor`]s
//! lazily so downstream stages can start before the walk completes.
//! Skipped files are reported through the `log` facade, never on the main
//! output.

mod error;
mod filter;
mod globs;
mod scanner;

pub use error::{Result, WalkError};
pub use filter::{decode_text, is_binary_prefix, sniff, SkipReason, DEFAULT_MAX_FILE_SIZE};
pub use globs::{GlobFilter, PatternSet};
pub use scanner::{normalize_separators, FileDescriptor, Scanner};
