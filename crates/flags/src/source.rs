use async_trait::async_trait;

use crate::Result;

/// A remote key/value flag lookup.
#[async_trait]
pub trait FlagSource: Send + Sync {
    /// Fetches the current value of a flag.
    async fn get(&self, name: &str) -> Result<String>;
}
