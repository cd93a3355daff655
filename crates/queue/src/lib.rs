//! Message queue used to hand sale events to the worker pool.
//!
//! Delivery is at-least-once. A received message becomes invisible for the
//! queue's visibility timeout; if it is not deleted with its receipt handle
//! before the timeout elapses, it is delivered again.

pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;
pub mod queue;

pub use error::{QueueError, Result};
pub use memory::InMemoryQueue;
pub use message::QueueMessage;
pub use postgres::PostgresQueue;
pub use queue::{DEFAULT_VISIBILITY_TIMEOUT, Queue};
