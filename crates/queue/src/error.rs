use thiserror::Error;

/// Errors that can occur when talking to the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No in-flight message holds this receipt handle.
    #[error("Receipt handle not found: {0}")]
    ReceiptNotFound(String),

    /// The queue could not serve the request.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
