use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Result, Sale, SaleId, StoreError,
    store::{IdempotencyStore, SaleStore},
};

#[derive(Debug, Default)]
struct SaleState {
    sales: HashMap<SaleId, Sale>,
    reads: usize,
    writes: usize,
    fail_on_update: bool,
}

/// In-memory sale store for testing.
///
/// Counts reads and writes so tests can assert that a code path left the
/// store untouched.
#[derive(Debug, Clone, Default)]
pub struct InMemorySaleStore {
    state: Arc<RwLock<SaleState>>,
}

impl InMemorySaleStore {
    /// Creates a new empty in-memory sale store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `mark_processed` to fail.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Total number of reads and writes served.
    pub async fn call_count(&self) -> usize {
        let state = self.state.read().await;
        state.reads + state.writes
    }

    /// Number of writes served (put, delete, mark_processed).
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// Returns the number of stored sales.
    pub async fn len(&self) -> usize {
        self.state.read().await.sales.len()
    }

    /// Returns true if the store holds no sales.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.sales.is_empty()
    }
}

#[async_trait]
impl SaleStore for InMemorySaleStore {
    async fn put(&self, sale: &Sale) -> Result<()> {
        let mut state = self.state.write().await;
        state.writes += 1;
        state.sales.insert(sale.id.clone(), sale.clone());
        Ok(())
    }

    async fn get(&self, id: &SaleId) -> Result<Option<Sale>> {
        let mut state = self.state.write().await;
        state.reads += 1;
        Ok(state.sales.get(id).cloned())
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.writes += 1;
        state.sales.remove(id);
        Ok(())
    }

    async fn mark_processed(&self, id: &SaleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.writes += 1;

        if state.fail_on_update {
            return Err(StoreError::Unavailable("simulated update failure".to_string()));
        }

        match state.sales.get_mut(id) {
            Some(sale) => {
                sale.processed = true;
                Ok(())
            }
            None => Err(StoreError::NotFound(id.clone())),
        }
    }
}

#[derive(Debug, Default)]
struct MarkerState {
    markers: HashSet<SaleId>,
    reads: usize,
    writes: usize,
    fail_on_put: bool,
}

/// In-memory idempotency store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdempotencyStore {
    state: Arc<RwLock<MarkerState>>,
}

impl InMemoryIdempotencyStore {
    /// Creates a new empty in-memory idempotency store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `put` to fail.
    pub async fn set_fail_on_put(&self, fail: bool) {
        self.state.write().await.fail_on_put = fail;
    }

    /// Total number of reads and writes served.
    pub async fn call_count(&self) -> usize {
        let state = self.state.read().await;
        state.reads + state.writes
    }

    /// Number of writes served.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// Returns the number of recorded markers.
    pub async fn len(&self) -> usize {
        self.state.read().await.markers.len()
    }

    /// Returns true if no markers are recorded.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.markers.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn exists(&self, id: &SaleId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.reads += 1;
        Ok(state.markers.contains(id))
    }

    async fn put(&self, id: &SaleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.writes += 1;

        if state.fail_on_put {
            return Err(StoreError::Unavailable("simulated marker write failure".to_string()));
        }

        state.markers.insert(id.clone());
        Ok(())
    }

    async fn delete(&self, id: &SaleId) -> Result<()> {
        let mut state = self.state.write().await;
        state.writes += 1;
        state.markers.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sale(id: &str) -> Sale {
        Sale {
            id: SaleId::from(id),
            product: "Widget".to_string(),
            amount: 9.99,
            processed: false,
            timestamp: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_put_and_get_sale() {
        let store = InMemorySaleStore::new();
        let sale = test_sale("abc");

        store.put(&sale).await.unwrap();

        let found = store.get(&sale.id).await.unwrap();
        assert_eq!(found, Some(sale));
    }

    #[tokio::test]
    async fn test_get_missing_sale_returns_none() {
        let store = InMemorySaleStore::new();
        let found = store.get(&SaleId::from("missing")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_mark_processed_only_touches_flag() {
        let store = InMemorySaleStore::new();
        let sale = test_sale("abc");
        store.put(&sale).await.unwrap();

        store.mark_processed(&sale.id).await.unwrap();

        let found = store.get(&sale.id).await.unwrap().unwrap();
        assert!(found.processed);
        assert_eq!(found.product, sale.product);
        assert_eq!(found.amount, sale.amount);
        assert_eq!(found.timestamp, sale.timestamp);
    }

    #[tokio::test]
    async fn test_mark_processed_twice_is_a_no_op() {
        let store = InMemorySaleStore::new();
        let sale = test_sale("abc");
        store.put(&sale).await.unwrap();

        store.mark_processed(&sale.id).await.unwrap();
        store.mark_processed(&sale.id).await.unwrap();

        assert!(store.get(&sale.id).await.unwrap().unwrap().processed);
    }

    #[tokio::test]
    async fn test_mark_processed_missing_sale_fails() {
        let store = InMemorySaleStore::new();
        let result = store.mark_processed(&SaleId::from("missing")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_sale() {
        let store = InMemorySaleStore::new();
        let sale = test_sale("abc");
        store.put(&sale).await.unwrap();

        store.delete(&sale.id).await.unwrap();

        assert!(store.is_empty().await);
        store.delete(&sale.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_update_failure() {
        let store = InMemorySaleStore::new();
        let sale = test_sale("abc");
        store.put(&sale).await.unwrap();
        store.set_fail_on_update(true).await;

        let result = store.mark_processed(&sale.id).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(!store.get(&sale.id).await.unwrap().unwrap().processed);
    }

    #[tokio::test]
    async fn test_call_count_tracks_reads_and_writes() {
        let store = InMemorySaleStore::new();
        let sale = test_sale("abc");
        assert_eq!(store.call_count().await, 0);

        store.put(&sale).await.unwrap();
        store.get(&sale.id).await.unwrap();

        assert_eq!(store.call_count().await, 2);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_marker_lifecycle() {
        let store = InMemoryIdempotencyStore::new();
        let id = SaleId::from("abc");

        assert!(!store.exists(&id).await.unwrap());

        store.put(&id).await.unwrap();
        store.put(&id).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.len().await, 1);

        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_marker_failure() {
        let store = InMemoryIdempotencyStore::new();
        let id = SaleId::from("abc");
        store.set_fail_on_put(true).await;

        assert!(store.put(&id).await.is_err());
        assert!(!store.exists(&id).await.unwrap());
    }
}
