//! Queue-driven worker pool that finalizes sales.
//!
//! Each sale event on the queue goes through the [`Pipeline`]:
//! 1. Gate on the site state (dry-run when not active)
//! 2. Skip sales that already carry an idempotency marker
//! 3. Mark the sale processed
//! 4. Archive the raw message
//! 5. Commit the idempotency marker
//!
//! A [`Dispatcher`] long-polls the queue and deletes a message only after the
//! pipeline succeeds; anything else is left for redelivery. The
//! [`WorkerPool`] runs several dispatchers against one queue.

pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod stage;

pub use dispatcher::{BatchReport, Dispatcher, DispatcherConfig, MessageOutcome};
pub use error::{PipelineError, Result, WorkerError};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use pool::{DEFAULT_WORKER_COUNT, WorkerPool, WorkerPoolHandle, resolve_worker_count};
pub use stage::PipelineStage;
