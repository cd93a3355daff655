//! Queue consumer loop.

use std::sync::Arc;
use std::time::Duration;

use flags::{DEFAULT_TTL, FlagCache, SiteState};
use queue::{Queue, QueueMessage};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::Result;
use crate::pipeline::Pipeline;

/// Settings shared by every dispatcher in a pool.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Name of the flag holding the site state.
    pub site_state_flag: String,
    /// How long a fetched site state is reused.
    pub site_state_ttl: Duration,
    /// Upper bound on messages per receive.
    pub max_messages: usize,
    /// Long-poll wait per receive.
    pub wait_time: Duration,
    /// Pause after a failed flag lookup or receive before the next iteration.
    pub idle_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            site_state_flag: "site-state".to_string(),
            site_state_ttl: DEFAULT_TTL,
            max_messages: 10,
            wait_time: Duration::from_secs(20),
            idle_interval: Duration::from_secs(1),
        }
    }
}

/// What happened to a single received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Pipeline succeeded and the message was deleted.
    Acknowledged,
    /// Pipeline succeeded but the delete failed; the message will be redelivered.
    Unacknowledged,
    /// Pipeline failed; the message will be redelivered.
    Failed,
}

/// Tally of one poll iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub acknowledged: usize,
    pub unacknowledged: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Acknowledged => self.acknowledged += 1,
            MessageOutcome::Unacknowledged => self.unacknowledged += 1,
            MessageOutcome::Failed => self.failed += 1,
        }
    }
}

/// Long-polls a queue and feeds each message to the pipeline.
///
/// A message is deleted only after the pipeline reports success. There is no
/// retry counting or dead-lettering: a message that keeps failing is
/// redelivered by the queue after every visibility timeout, indefinitely.
pub struct Dispatcher {
    worker: usize,
    queue: Arc<dyn Queue>,
    pipeline: Arc<Pipeline>,
    flags: Arc<FlagCache>,
    config: Arc<DispatcherConfig>,
}

impl Dispatcher {
    /// Creates a dispatcher tagged with `worker` in logs and metrics.
    pub fn new(
        worker: usize,
        queue: Arc<dyn Queue>,
        pipeline: Arc<Pipeline>,
        flags: Arc<FlagCache>,
        config: Arc<DispatcherConfig>,
    ) -> Self {
        Self {
            worker,
            queue,
            pipeline,
            flags,
            config,
        }
    }

    /// Runs poll iterations until `cancel` fires.
    ///
    /// Cancellation is honored at every await point, including mid-pipeline;
    /// an abandoned message is redelivered once its visibility timeout expires.
    pub async fn run(&self, cancel: CancellationToken) {
        let span = tracing::info_span!("dispatcher", worker = self.worker);
        async {
            tracing::info!(queue_wait = ?self.config.wait_time, "starting consumer");

            loop {
                let site_state = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    state = self.resolve_site_state() => state,
                };
                let Ok(site_state) = site_state else {
                    if !self.idle(&cancel).await {
                        break;
                    }
                    continue;
                };

                let batch = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    batch = self.receive_batch() => batch,
                };
                let Ok(batch) = batch else {
                    if !self.idle(&cancel).await {
                        break;
                    }
                    continue;
                };

                for message in batch {
                    let message_id = message.message_id.clone();
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::info!(%message_id, "abandoning in-flight message");
                            break;
                        }
                        _ = self.handle_message(message, &site_state) => {}
                    }
                }
            }

            tracing::info!("consumer stopped");
        }
        .instrument(span)
        .await
    }

    /// Runs a single iteration: resolve site state, receive, process.
    ///
    /// Fails only when the site state cannot be resolved or the receive call
    /// fails; per-message failures are tallied in the report.
    pub async fn poll_once(&self) -> Result<BatchReport> {
        let site_state = self.resolve_site_state().await?;
        let batch = self.receive_batch().await?;

        let mut report = BatchReport {
            received: batch.len(),
            ..Default::default()
        };
        for message in batch {
            report.record(self.handle_message(message, &site_state).await);
        }

        Ok(report)
    }

    async fn resolve_site_state(&self) -> Result<SiteState> {
        self.flags
            .site_state(&self.config.site_state_flag, self.config.site_state_ttl)
            .await
            .map_err(|e| {
                tracing::error!(
                    worker = self.worker,
                    flag = %self.config.site_state_flag,
                    error = %e,
                    "failed to resolve site state, skipping receive"
                );
                metrics::counter!("worker_poll_errors_total", "reason" => "site_state")
                    .increment(1);
                e.into()
            })
    }

    async fn receive_batch(&self) -> Result<Vec<QueueMessage>> {
        let batch = self
            .queue
            .receive(self.config.max_messages, self.config.wait_time)
            .await
            .map_err(|e| {
                tracing::error!(worker = self.worker, error = %e, "failed to receive messages");
                metrics::counter!("worker_poll_errors_total", "reason" => "receive").increment(1);
                e
            })?;

        if !batch.is_empty() {
            tracing::debug!(worker = self.worker, count = batch.len(), "received batch");
        }
        Ok(batch)
    }

    /// Processes one message and deletes it on success.
    pub async fn handle_message(
        &self,
        message: QueueMessage,
        site_state: &SiteState,
    ) -> MessageOutcome {
        let span = tracing::info_span!(
            "message",
            worker = self.worker,
            message_id = %message.message_id,
            receive_count = message.receive_count,
        );

        async {
            metrics::counter!("worker_messages_received_total").increment(1);

            if let Err(e) = self.pipeline.process(&message.body, site_state).await {
                tracing::error!(stage = %e.stage, error = %e.source, "failed to process sale");
                metrics::counter!("worker_messages_failed_total").increment(1);
                return MessageOutcome::Failed;
            }

            match self.queue.delete(&message.receipt_handle).await {
                Ok(()) => {
                    tracing::info!("message removed from queue");
                    metrics::counter!("worker_messages_acknowledged_total").increment(1);
                    MessageOutcome::Acknowledged
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to delete message from queue");
                    metrics::counter!("worker_ack_failures_total").increment(1);
                    MessageOutcome::Unacknowledged
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Sleeps for the idle interval. Returns false if cancelled meanwhile.
    async fn idle(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.idle_interval) => true,
        }
    }
}
