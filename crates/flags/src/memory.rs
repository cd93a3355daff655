use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{FlagError, Result, source::FlagSource};

#[derive(Debug, Default)]
struct FlagState {
    values: HashMap<String, String>,
    fetches: usize,
    fail: bool,
}

/// In-memory flag source for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlagSource {
    state: Arc<RwLock<FlagState>>,
}

impl InMemoryFlagSource {
    /// Creates an empty flag source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag source holding a single flag.
    pub fn with_flag(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(name.into(), value.into());
        Self {
            state: Arc::new(RwLock::new(FlagState {
                values,
                ..Default::default()
            })),
        }
    }

    /// Sets a flag value.
    pub async fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state.write().await.values.insert(name.into(), value.into());
    }

    /// Makes every subsequent fetch fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    /// Number of fetches served, including failed ones.
    pub async fn fetch_count(&self) -> usize {
        self.state.read().await.fetches
    }
}

#[async_trait]
impl FlagSource for InMemoryFlagSource {
    async fn get(&self, name: &str) -> Result<String> {
        let mut state = self.state.write().await;
        state.fetches += 1;

        if state.fail {
            return Err(FlagError::Unavailable("simulated flag failure".to_string()));
        }

        state
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| FlagError::NotFound(name.to_string()))
    }
}
