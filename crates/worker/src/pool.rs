//! Worker pool running several dispatchers against one queue.

use std::sync::Arc;

use flags::FlagCache;
use queue::Queue;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::pipeline::Pipeline;

/// Worker count used when the configured value is missing or invalid.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Parses a configured worker count.
///
/// Missing, non-numeric, zero and negative values fall back to
/// [`DEFAULT_WORKER_COUNT`]. The fallback is logged, never surfaced.
pub fn resolve_worker_count(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_WORKER_COUNT;
    };

    match raw.trim().parse::<i64>() {
        Ok(count) if count > 0 => usize::try_from(count).unwrap_or(DEFAULT_WORKER_COUNT),
        Ok(count) => {
            tracing::warn!(
                configured = count,
                default = DEFAULT_WORKER_COUNT,
                "worker count must be positive, using default"
            );
            DEFAULT_WORKER_COUNT
        }
        Err(e) => {
            tracing::error!(
                configured = raw,
                error = %e,
                default = DEFAULT_WORKER_COUNT,
                "invalid worker count, using default"
            );
            DEFAULT_WORKER_COUNT
        }
    }
}

/// Spawns independent dispatcher loops sharing one queue client.
///
/// Workers share no in-memory state besides the flag cache. Two workers never
/// see the same message while it is in flight, and redelivered copies are
/// made harmless by the idempotency marker.
pub struct WorkerPool {
    queue: Arc<dyn Queue>,
    pipeline: Arc<Pipeline>,
    flags: Arc<FlagCache>,
    config: Arc<DispatcherConfig>,
    workers: usize,
}

impl WorkerPool {
    /// Creates a pool of `workers` dispatchers. Zero means the default.
    pub fn new(
        queue: Arc<dyn Queue>,
        pipeline: Arc<Pipeline>,
        flags: Arc<FlagCache>,
        config: DispatcherConfig,
        workers: usize,
    ) -> Self {
        let workers = if workers == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            workers
        };

        Self {
            queue,
            pipeline,
            flags,
            config: Arc::new(config),
            workers,
        }
    }

    /// Returns the number of dispatchers this pool starts.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Builds the dispatcher for a worker index.
    pub fn dispatcher(&self, worker: usize) -> Dispatcher {
        Dispatcher::new(
            worker,
            Arc::clone(&self.queue),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.flags),
            Arc::clone(&self.config),
        )
    }

    /// Spawns every dispatcher on the current runtime.
    ///
    /// All loops stop when `cancel` fires.
    pub fn spawn(&self, cancel: CancellationToken) -> WorkerPoolHandle {
        let mut tasks = JoinSet::new();

        for worker in 0..self.workers {
            let dispatcher = self.dispatcher(worker);
            let token = cancel.clone();
            tasks.spawn(async move { dispatcher.run(token).await });
        }

        metrics::gauge!("worker_pool_size").set(self.workers as f64);
        tracing::info!(workers = self.workers, "worker pool started");

        WorkerPoolHandle { tasks, cancel }
    }
}

/// Running pool returned by [`WorkerPool::spawn`].
pub struct WorkerPoolHandle {
    tasks: JoinSet<()>,
    cancel: CancellationToken,
}

impl WorkerPoolHandle {
    /// Number of dispatcher loops still running.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Signals every dispatcher to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for every dispatcher to exit.
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
        metrics::gauge!("worker_pool_size").set(0.0);
        tracing::info!("worker pool stopped");
    }

    /// Cancels every dispatcher and waits for them to exit.
    pub async fn shutdown(self) {
        self.cancel();
        self.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive::InMemoryBlobStore;
    use flags::InMemoryFlagSource;
    use queue::InMemoryQueue;
    use std::time::Duration;
    use store::{InMemoryIdempotencyStore, InMemorySaleStore};

    fn test_pool(workers: usize, flags: InMemoryFlagSource) -> WorkerPool {
        let pipeline = Pipeline::new(
            Arc::new(InMemorySaleStore::new()),
            Arc::new(InMemoryIdempotencyStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            "bucket",
        );
        let config = DispatcherConfig {
            site_state_ttl: Duration::ZERO,
            wait_time: Duration::from_millis(20),
            idle_interval: Duration::from_millis(5),
            ..Default::default()
        };

        WorkerPool::new(
            Arc::new(InMemoryQueue::new()),
            Arc::new(pipeline),
            Arc::new(FlagCache::new(Arc::new(flags))),
            config,
            workers,
        )
    }

    #[test]
    fn test_resolve_valid_count() {
        assert_eq!(resolve_worker_count(Some("4")), 4);
        assert_eq!(resolve_worker_count(Some(" 8 ")), 8);
        assert_eq!(resolve_worker_count(Some("1")), 1);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        assert_eq!(resolve_worker_count(None), DEFAULT_WORKER_COUNT);
        assert_eq!(resolve_worker_count(Some("")), DEFAULT_WORKER_COUNT);
        assert_eq!(resolve_worker_count(Some("abc")), DEFAULT_WORKER_COUNT);
        assert_eq!(resolve_worker_count(Some("2.5")), DEFAULT_WORKER_COUNT);
        assert_eq!(resolve_worker_count(Some("0")), DEFAULT_WORKER_COUNT);
        assert_eq!(resolve_worker_count(Some("-3")), DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn test_zero_workers_means_default() {
        let pool = test_pool(0, InMemoryFlagSource::with_flag("site-state", "ACTIVE"));
        assert_eq!(pool.worker_count(), DEFAULT_WORKER_COUNT);
    }

    #[tokio::test]
    async fn test_invalid_config_starts_two_dispatchers() {
        for raw in ["abc", "0", "-1"] {
            let flags = InMemoryFlagSource::with_flag("site-state", "ACTIVE");
            let pool = test_pool(resolve_worker_count(Some(raw)), flags);
            let handle = pool.spawn(CancellationToken::new());

            assert_eq!(handle.running(), 2, "configured {raw:?}");
            handle.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_every_worker_polls() {
        let flags = InMemoryFlagSource::with_flag("site-state", "ACTIVE");
        let pool = test_pool(3, flags.clone());
        let handle = pool.spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(10)).await;
        // Each loop resolves the site state before its first receive.
        assert!(flags.fetch_count().await >= 3);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_external_cancel_stops_pool() {
        let pool = test_pool(2, InMemoryFlagSource::with_flag("site-state", "ACTIVE"));
        let cancel = CancellationToken::new();
        let handle = pool.spawn(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("pool did not stop");
    }
}
