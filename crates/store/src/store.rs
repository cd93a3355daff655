use async_trait::async_trait;

use crate::{Result, Sale, SaleId};

/// Keyed store of sale records.
///
/// Implementations must be read-after-write consistent; the worker relies on
/// a lookup immediately reflecting a preceding `put` or `mark_processed`.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Inserts or replaces a sale record.
    async fn put(&self, sale: &Sale) -> Result<()>;

    /// Looks up a sale by id. Returns None if it does not exist.
    async fn get(&self, id: &SaleId) -> Result<Option<Sale>>;

    /// Removes a sale. Deleting an absent sale is not an error.
    async fn delete(&self, id: &SaleId) -> Result<()>;

    /// Sets the processed flag to true without rewriting the rest of the record.
    ///
    /// Setting an already-processed sale again is a no-op. Fails with
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) if the sale does not exist.
    async fn mark_processed(&self, id: &SaleId) -> Result<()>;
}

/// Keyed store of idempotency markers.
///
/// A marker carries no payload; its existence means the sale finished the
/// worker pipeline.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Returns true if a marker exists for the sale.
    async fn exists(&self, id: &SaleId) -> Result<bool>;

    /// Records a marker for the sale. Writing an existing marker is a no-op.
    async fn put(&self, id: &SaleId) -> Result<()>;

    /// Removes a marker, allowing the sale to be processed again.
    async fn delete(&self, id: &SaleId) -> Result<()>;
}
