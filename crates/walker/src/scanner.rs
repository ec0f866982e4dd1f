use crate::error::{Result, WalkError};
use crate::filter::{self, SkipReason};
use crate::globs::GlobFilter;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Normalize path separators for cross-platform compatibility
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Immutable record of one candidate file, produced by the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Path relative to the scan root, forward-slash normalized
    pub rel_path: String,
    /// Absolute path used for I/O
    pub abs_path: PathBuf,
    /// Declared size in bytes
    pub size: u64,
    /// Modification time, seconds since the Unix epoch (0 if unavailable)
    pub mtime: u64,
    /// Creation time, seconds since the Unix epoch (mtime if unavailable)
    pub ctime: u64,
}

/// Deterministic repository scanner.
///
/// Enumerates directory entries lexicographically, prunes excluded subtrees
/// through the glob filter, rejects binary and oversize files, and yields
/// descriptors lazily so the first file can be processed before the walk
/// completes.
pub struct Scanner {
    root: PathBuf,
    filter: Arc<GlobFilter>,
    max_file_size: u64,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>, filter: GlobFilter, max_file_size: u64) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(WalkError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(WalkError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            filter: Arc::new(filter),
            max_file_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root, yielding descriptors for admissible files
    pub fn scan(&self) -> impl Iterator<Item = FileDescriptor> + '_ {
        let prune_root = self.root.clone();
        let prune_filter = Arc::clone(&self.filter);

        let walk = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .sort_by_file_name(std::ffi::OsStr::cmp)
            .filter_entry(move |entry| {
                if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                let Some(rel) = relative_to(&prune_root, entry.path()) else {
                    return true;
                };
                if rel.is_empty() {
                    // The root itself is never pruned.
                    return true;
                }
                if prune_filter.prunes(&rel) {
                    log::debug!("[SKIP DIR] {rel} (matches exclude pattern)");
                    return false;
                }
                true
            })
            .build();

        walk.filter_map(move |result| {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("walk error: {e}");
                    return None;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                return None;
            }

            let rel_path = relative_to(&self.root, entry.path())?;
            if !self.filter.admits(&rel_path) {
                return None;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("[SKIP] {rel_path} (metadata unavailable: {e})");
                    return None;
                }
            };
            let size = metadata.len();

            if let Some(reason) = filter::sniff(entry.path(), size, self.max_file_size) {
                self.report_skip(&rel_path, reason);
                return None;
            }

            let mtime = secs_since_epoch(metadata.modified().ok()).unwrap_or(0);
            let ctime = secs_since_epoch(metadata.created().ok()).unwrap_or(mtime);

            Some(FileDescriptor {
                rel_path,
                abs_path: entry.path().to_path_buf(),
                size,
                mtime,
                ctime,
            })
        })
    }

    fn report_skip(&self, rel_path: &str, reason: SkipReason) {
        log::info!("[SKIP] {rel_path} ({})", reason.as_str());
    }
}

fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(normalize_separators(&rel.to_string_lossy()))
}

fn secs_since_epoch(time: Option<SystemTime>) -> Option<u64> {
    time?
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
