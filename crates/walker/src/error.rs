use std::path::PathBuf;
use thiserror::Error;

/// Result type for walker operations
pub type Result<T> = std::result::Result<T, WalkError>;

/// Errors that can occur while scanning a repository
#[derive(Error, Debug)]
pub enum WalkError {
    /// The requested root does not exist
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// The requested root exists but is not a directory
    #[error("'{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// A glob pattern failed to compile
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WalkError {
    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}
