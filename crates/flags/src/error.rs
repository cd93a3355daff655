use thiserror::Error;

/// Errors that can occur when resolving a flag.
#[derive(Debug, Error)]
pub enum FlagError {
    /// No flag is defined under the name.
    #[error("Flag not found: {0}")]
    NotFound(String),

    /// The flag source could not serve the request.
    #[error("Flag source unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for flag operations.
pub type Result<T> = std::result::Result<T, FlagError>;
