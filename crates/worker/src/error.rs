//! Worker error types.

use archive::ArchiveError;
use common::SaleId;
use flags::FlagError;
use queue::QueueError;
use store::StoreError;
use thiserror::Error;

use crate::stage::PipelineStage;

/// Errors that can occur while consuming and processing messages.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The message body is not a valid sale.
    #[error("Malformed sale payload: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The message references a sale the store does not hold.
    #[error("Sale not found: {0}")]
    SaleNotFound(SaleId),

    /// Sale or idempotency store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Archive error.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Queue error.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Flag source error.
    #[error("Flag error: {0}")]
    Flag(#[from] FlagError),
}

/// A pipeline run that stopped before committing.
///
/// `stage` is the last stage the message reached; the side effects of every
/// stage up to it have been applied and are safe to repeat.
#[derive(Debug, Error)]
#[error("Pipeline failed after {stage}: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: WorkerError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: impl Into<WorkerError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Convenience type alias for worker results.
pub type Result<T> = std::result::Result<T, WorkerError>;
