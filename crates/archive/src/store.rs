use async_trait::async_trait;

use crate::Result;

/// Object storage for archived messages.
///
/// `put` is a whole-object replace: writing the same key twice leaves the
/// second payload, never a mix of both.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes an object, replacing any existing object under the same key.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Reads an object. Returns None if it does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;
}
