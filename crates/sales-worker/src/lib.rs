//! Sales worker service.
//!
//! Wires the PostgreSQL-backed stores, queue and flag source into a
//! [`worker::WorkerPool`] and serves `/health` and `/metrics` next to it,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use archive::FsBlobStore;
use axum::Router;
use axum::routing::get;
use flags::{FlagCache, PostgresFlagSource, SiteState};
use metrics_exporter_prometheus::PrometheusHandle;
use queue::PostgresQueue;
use sqlx::PgPool;
use store::{PostgresIdempotencyStore, PostgresSaleStore};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use worker::{Pipeline, WorkerPool};

pub use config::{Config, LogFormat};
pub use error::{AppError, Result};

/// State shared by the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub workers: usize,
}

/// Creates the Axum router serving health and metrics.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Registers descriptions for the metrics the worker emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "worker_messages_received_total",
        "Messages received from the sales queue"
    );
    metrics::describe_counter!(
        "worker_messages_acknowledged_total",
        "Messages deleted after the pipeline succeeded"
    );
    metrics::describe_counter!(
        "worker_messages_failed_total",
        "Messages left on the queue after a pipeline failure"
    );
    metrics::describe_counter!(
        "worker_ack_failures_total",
        "Deletes that failed after the pipeline succeeded"
    );
    metrics::describe_counter!(
        "worker_poll_errors_total",
        "Poll iterations aborted by a flag or receive error"
    );
    metrics::describe_counter!(
        "pipeline_outcomes_total",
        "Pipeline results by outcome and stage"
    );
    metrics::describe_histogram!(
        "pipeline_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent processing one message"
    );
    metrics::describe_counter!("flag_cache_hits_total", "Flag lookups served from cache");
    metrics::describe_counter!(
        "flag_cache_misses_total",
        "Flag lookups that reached the flag source"
    );
    metrics::describe_gauge!("worker_pool_size", "Dispatchers currently running");
    metrics::describe_counter!(
        "store_sales_marked_processed_total",
        "Sales flagged processed in PostgreSQL"
    );
    metrics::describe_counter!("queue_messages_sent_total", "Messages published to the queue");
}

/// Resolves the site state once before any worker starts.
pub async fn preflight(flags: &FlagCache, config: &Config) -> Result<SiteState> {
    let state = flags
        .site_state(&config.site_state_flag, config.site_state_ttl)
        .await
        .map_err(AppError::SiteState)?;

    if !state.is_active() {
        tracing::warn!(site_state = %state, "site is not active, workers will drain in dry-run");
    }

    Ok(state)
}

/// Builds the worker pool over the PostgreSQL and filesystem backends.
pub fn build_worker_pool(pool: &PgPool, flags: Arc<FlagCache>, config: &Config) -> WorkerPool {
    let queue = PostgresQueue::new(pool.clone(), config.sales_queue.clone())
        .with_visibility_timeout(config.queue_visibility_timeout);

    let pipeline = Pipeline::new(
        Arc::new(PostgresSaleStore::new(pool.clone())),
        Arc::new(PostgresIdempotencyStore::new(pool.clone())),
        Arc::new(FsBlobStore::new(config.archive_root.clone())),
        config.archive_bucket.clone(),
    );

    WorkerPool::new(
        Arc::new(queue),
        Arc::new(pipeline),
        flags,
        config.dispatcher_config(),
        config.consumer_threads,
    )
}

/// Runs the service until `shutdown` resolves.
///
/// The workers are cancelled together with the HTTP server and awaited
/// before returning.
pub async fn run<F>(config: Config, metrics_handle: PrometheusHandle, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let pool = PgPool::connect(&config.database_url).await?;
    store::run_migrations(&pool).await?;
    tracing::info!("database ready");

    let flags = Arc::new(FlagCache::new(Arc::new(PostgresFlagSource::new(
        pool.clone(),
    ))));
    let site_state = preflight(&flags, &config).await?;
    tracing::info!(site_state = %site_state, "site state resolved");

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    let worker_pool = build_worker_pool(&pool, flags, &config);
    let cancel = CancellationToken::new();
    let workers = worker_pool.spawn(cancel.clone());

    let state = Arc::new(AppState {
        workers: worker_pool.worker_count(),
    });
    let app = create_app(state, metrics_handle);

    tracing::info!(addr = %config.addr(), queue = %config.sales_queue, "starting sales worker");

    let token = cancel.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            token.cancel();
        })
        .await;

    workers.shutdown().await;
    pool.close().await;
    served?;

    Ok(())
}
