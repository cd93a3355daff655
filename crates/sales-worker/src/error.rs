//! Startup errors for the sales worker service.

use flags::FlagError;
use store::StoreError;
use thiserror::Error;

/// Errors that stop the service before or while it serves.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("schema setup failed: {0}")]
    Store(#[from] StoreError),

    /// The site state could not be resolved at startup.
    #[error("site state unavailable: {0}")]
    SiteState(#[source] FlagError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
