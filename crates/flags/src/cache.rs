//! Read-through TTL cache in front of a [`FlagSource`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{Result, SiteState, source::FlagSource};

/// Default time a fetched flag value is served from the cache.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CachedFlag {
    value: String,
    expires_at: Instant,
}

/// Caches flag values per name for a caller-supplied TTL.
///
/// Shared across workers behind an `Arc`. Concurrent misses for the same name
/// may each hit the source; the last fetch wins. Failed fetches are never
/// cached, so a degraded source is retried on every call.
pub struct FlagCache {
    source: Arc<dyn FlagSource>,
    entries: RwLock<HashMap<String, CachedFlag>>,
}

impl FlagCache {
    /// Creates a cache in front of the given source.
    pub fn new(source: Arc<dyn FlagSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the flag value, fetching it if absent or older than `ttl`.
    ///
    /// A zero `ttl` bypasses the cache entirely.
    pub async fn get(&self, name: &str, ttl: Duration) -> Result<String> {
        if ttl.is_zero() {
            return self.source.get(name).await;
        }

        if let Some(cached) = self.entries.read().await.get(name)
            && cached.expires_at > Instant::now()
        {
            metrics::counter!("flag_cache_hits_total").increment(1);
            return Ok(cached.value.clone());
        }

        metrics::counter!("flag_cache_misses_total").increment(1);
        tracing::debug!(flag = name, "flag not cached, fetching from source");

        let value = self.source.get(name).await?;
        self.entries.write().await.insert(
            name.to_string(),
            CachedFlag {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );

        Ok(value)
    }

    /// Resolves the site state held in the named flag.
    pub async fn site_state(&self, name: &str, ttl: Duration) -> Result<SiteState> {
        self.get(name, ttl).await.map(SiteState::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlagError, InMemoryFlagSource};

    const FLAG: &str = "site-state";

    fn cache_with(source: &InMemoryFlagSource) -> FlagCache {
        FlagCache::new(Arc::new(source.clone()))
    }

    #[tokio::test]
    async fn test_serves_cached_value_within_ttl() {
        let source = InMemoryFlagSource::with_flag(FLAG, "ACTIVE");
        let cache = cache_with(&source);

        assert_eq!(cache.get(FLAG, DEFAULT_TTL).await.unwrap(), "ACTIVE");
        source.set(FLAG, "INACTIVE").await;
        assert_eq!(cache.get(FLAG, DEFAULT_TTL).await.unwrap(), "ACTIVE");

        assert_eq!(source.fetch_count().await, 1);
    }

    #[tokio::test]
    async fn test_refetches_after_expiry() {
        let source = InMemoryFlagSource::with_flag(FLAG, "ACTIVE");
        let cache = cache_with(&source);
        let ttl = Duration::from_millis(20);

        cache.get(FLAG, ttl).await.unwrap();
        source.set(FLAG, "INACTIVE").await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get(FLAG, ttl).await.unwrap(), "INACTIVE");
        assert_eq!(source.fetch_count().await, 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_bypasses_cache() {
        let source = InMemoryFlagSource::with_flag(FLAG, "ACTIVE");
        let cache = cache_with(&source);

        cache.get(FLAG, Duration::ZERO).await.unwrap();
        cache.get(FLAG, Duration::ZERO).await.unwrap();

        assert_eq!(source.fetch_count().await, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let source = InMemoryFlagSource::with_flag(FLAG, "ACTIVE");
        let cache = cache_with(&source);

        source.set_fail(true).await;
        assert!(matches!(
            cache.get(FLAG, DEFAULT_TTL).await,
            Err(FlagError::Unavailable(_))
        ));

        source.set_fail(false).await;
        assert_eq!(cache.get(FLAG, DEFAULT_TTL).await.unwrap(), "ACTIVE");
    }

    #[tokio::test]
    async fn test_missing_flag_is_an_error() {
        let source = InMemoryFlagSource::new();
        let cache = cache_with(&source);

        assert!(matches!(
            cache.get("nope", DEFAULT_TTL).await,
            Err(FlagError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let source = InMemoryFlagSource::with_flag(FLAG, "ACTIVE");
        let cache = Arc::new(cache_with(&source));
        cache.get(FLAG, DEFAULT_TTL).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.site_state(FLAG, DEFAULT_TTL).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_active());
        }

        assert_eq!(source.fetch_count().await, 1);
    }
}
