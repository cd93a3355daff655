use std::time::Duration;

use async_trait::async_trait;

use crate::{QueueMessage, Result};

/// Default time a received message stays invisible to other consumers.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// An at-least-once message queue.
///
/// A well-behaved queue never hands the same message to two consumers while
/// its visibility timeout has not expired.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Enqueues a message body. Returns the assigned message id.
    async fn send(&self, body: String) -> Result<String>;

    /// Receives up to `max` visible messages, waiting up to `wait` for at
    /// least one to become available. An empty batch means the wait elapsed.
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>>;

    /// Acknowledges a delivery, removing the message from the queue.
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}
