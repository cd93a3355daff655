use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{DEFAULT_VISIBILITY_TIMEOUT, QueueError, QueueMessage, Result, queue::Queue};

#[derive(Debug)]
struct Entry {
    message_id: String,
    body: String,
    receipt_handle: Option<String>,
    visible_at: Instant,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    deletes: usize,
    fail_on_receive: bool,
    fail_on_delete: bool,
}

/// In-memory queue with visibility timeouts.
///
/// Long polls park on a [`Notify`] until a message is sent, an in-flight
/// message becomes visible again, or the wait elapses.
#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    visibility_timeout: Duration,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    /// Creates an empty queue with the default visibility timeout.
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    /// Creates an empty queue with a custom visibility timeout.
    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            notify: Arc::new(Notify::new()),
            visibility_timeout,
        }
    }

    /// Number of messages held, visible or in flight.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Returns true if the queue holds no messages.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Number of messages currently invisible to consumers.
    pub async fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.visible_at > now)
            .count()
    }

    /// Number of successful deletes.
    pub async fn delete_count(&self) -> usize {
        self.state.lock().await.deletes
    }

    /// Configures `receive` to fail.
    pub async fn set_fail_on_receive(&self, fail: bool) {
        self.state.lock().await.fail_on_receive = fail;
    }

    /// Configures `delete` to fail.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        self.state.lock().await.fail_on_delete = fail;
    }

    /// Makes every in-flight message visible immediately, as if its
    /// visibility timeout had expired.
    pub async fn expire_in_flight(&self) {
        let now = Instant::now();
        for entry in self.state.lock().await.entries.iter_mut() {
            entry.visible_at = entry.visible_at.min(now);
        }
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn send(&self, body: String) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        self.state.lock().await.entries.push_back(Entry {
            message_id: message_id.clone(),
            body,
            receipt_handle: None,
            visible_at: Instant::now(),
            receive_count: 0,
        });
        self.notify.notify_waiters();
        Ok(message_id)
    }

    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + wait;

        loop {
            // Registered before inspecting state so a concurrent send is not missed.
            let notified = self.notify.notified();

            let next_visible = {
                let mut state = self.state.lock().await;
                if state.fail_on_receive {
                    return Err(QueueError::Unavailable("simulated receive failure".to_string()));
                }

                let now = Instant::now();
                let mut batch = Vec::new();
                for entry in state.entries.iter_mut() {
                    if batch.len() >= max {
                        break;
                    }
                    if entry.visible_at > now {
                        continue;
                    }

                    let receipt_handle = Uuid::new_v4().to_string();
                    entry.receipt_handle = Some(receipt_handle.clone());
                    entry.visible_at = now + self.visibility_timeout;
                    entry.receive_count += 1;

                    batch.push(QueueMessage {
                        message_id: entry.message_id.clone(),
                        body: entry.body.clone(),
                        receipt_handle,
                        receive_count: entry.receive_count,
                    });
                }

                if !batch.is_empty() {
                    return Ok(batch);
                }

                state.entries.iter().map(|e| e.visible_at).min()
            };

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = next_visible.map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_on_delete {
            return Err(QueueError::Unavailable("simulated delete failure".to_string()));
        }

        let position = state
            .entries
            .iter()
            .position(|e| e.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| QueueError::ReceiptNotFound(receipt_handle.to_string()))?;

        state.entries.remove(position);
        state.deletes += 1;
        Ok(())
    }
}
