use thiserror::Error;

/// Result type for core pipeline operations
pub type Result<T> = std::result::Result<T, PackError>;

/// Errors that terminate a pack run.
///
/// Per-file problems (unreadable, binary, decode failure) are not errors;
/// they are reported on the diagnostic channel and the run continues.
#[derive(Error, Debug)]
pub enum PackError {
    /// Malformed configuration file or invalid option combination
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested lens does not exist
    #[error("unknown lens '{name}'. Available: {available}")]
    UnknownLens { name: String, available: String },

    /// Walker-level failure (bad root, invalid glob)
    #[error(transparent)]
    Walk(#[from] contextpack_walker::WalkError),

    /// Invalid token budget string
    #[error(transparent)]
    Budget(#[from] contextpack_analyzers::BudgetParseError),

    /// Output sink rejected a write; propagated, run terminates
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
