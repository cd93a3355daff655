use thiserror::Error;

use crate::SaleId;

/// Errors that can occur when interacting with a keyed store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The targeted sale does not exist.
    #[error("Sale not found: {0}")]
    NotFound(SaleId),

    /// The backing store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
