use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ArchiveError, Result, store::BlobStore};

#[derive(Debug, Default)]
struct BlobState {
    objects: HashMap<(String, String), Vec<u8>>,
    puts: usize,
    fail_on_put: bool,
}

/// In-memory blob store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<RwLock<BlobState>>,
}

impl InMemoryBlobStore {
    /// Creates a new empty in-memory blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `put` to fail.
    pub async fn set_fail_on_put(&self, fail: bool) {
        self.state.write().await.fail_on_put = fail;
    }

    /// Number of `put` calls served, including failed ones.
    pub async fn put_count(&self) -> usize {
        self.state.read().await.puts
    }

    /// Returns the number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Returns the keys stored in a bucket, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<_> = state
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.state.write().await;
        state.puts += 1;

        if state.fail_on_put {
            return Err(ArchiveError::Unavailable("simulated put failure".to_string()));
        }

        state
            .objects
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }
}
