use thiserror::Error;

/// Errors that can occur when writing to or reading from the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The key is not a valid relative object path.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// The archive could not serve the request.
    #[error("Archive unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
