//! Per-message processing pipeline.
//!
//! The side effects are not transactional. Each step is safe to repeat on
//! redelivery:
//! - the status update only ever sets `processed` to true, and is skipped
//!   when the stored sale is already processed
//! - the archive key is derived from the sale id and day, and a put replaces
//!   the whole object
//! - the idempotency marker put is an upsert
//!
//! The marker is written last, so its presence implies every earlier step
//! has completed at least once.

use std::sync::Arc;

use archive::{BlobStore, sale_key};
use chrono::{DateTime, Utc};
use common::Sale;
use flags::SiteState;
use store::{IdempotencyStore, SaleStore};

use crate::error::{PipelineError, WorkerError};
use crate::stage::PipelineStage;

/// How a message left the pipeline successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Site state is not active; acknowledged without side effects.
    DryRun,
    /// An idempotency marker already existed; acknowledged without side effects.
    Duplicate,
    /// All side effects applied and the marker committed.
    Committed,
}

impl PipelineOutcome {
    /// Returns the outcome name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineOutcome::DryRun => "dry_run",
            PipelineOutcome::Duplicate => "duplicate",
            PipelineOutcome::Committed => "committed",
        }
    }

    /// Returns the last stage a message reached with this outcome.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineOutcome::DryRun => PipelineStage::Received,
            PipelineOutcome::Duplicate => PipelineStage::GateChecked,
            PipelineOutcome::Committed => PipelineStage::Committed,
        }
    }
}

impl std::fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives a single message through gate, idempotency check, status update,
/// archival and idempotency commit.
pub struct Pipeline {
    sales: Arc<dyn SaleStore>,
    idempotency: Arc<dyn IdempotencyStore>,
    archive: Arc<dyn BlobStore>,
    bucket: String,
    clock: fn() -> DateTime<Utc>,
}

impl Pipeline {
    /// Creates a pipeline archiving into `bucket`.
    pub fn new(
        sales: Arc<dyn SaleStore>,
        idempotency: Arc<dyn IdempotencyStore>,
        archive: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            sales,
            idempotency,
            archive,
            bucket: bucket.into(),
            clock: Utc::now,
        }
    }

    /// Replaces the clock used to pick the archive day partition.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Processes one message body under the given site state.
    ///
    /// On error nothing is rolled back; the caller must leave the message on
    /// the queue so it is redelivered.
    #[tracing::instrument(
        skip(self, body),
        fields(site_state = %site_state, sale_id = tracing::field::Empty)
    )]
    pub async fn process(
        &self,
        body: &str,
        site_state: &SiteState,
    ) -> Result<PipelineOutcome, PipelineError> {
        let start = std::time::Instant::now();
        let result = self.run(body, site_state).await;

        metrics::histogram!("pipeline_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => {
                metrics::counter!(
                    "pipeline_outcomes_total",
                    "outcome" => outcome.as_str(),
                    "stage" => outcome.stage().as_str()
                )
                .increment(1);
            }
            Err(e) => {
                metrics::counter!(
                    "pipeline_outcomes_total",
                    "outcome" => "failed",
                    "stage" => e.stage.as_str()
                )
                .increment(1);
            }
        }

        result
    }

    async fn run(
        &self,
        body: &str,
        site_state: &SiteState,
    ) -> Result<PipelineOutcome, PipelineError> {
        if !site_state.is_active() {
            tracing::info!("dry-running message, site is not active");
            return Ok(PipelineOutcome::DryRun);
        }
        let mut stage = PipelineStage::GateChecked;

        let sale: Sale = serde_json::from_str(body).map_err(|e| PipelineError::new(stage, e))?;
        tracing::Span::current().record("sale_id", tracing::field::display(&sale.id));

        tracing::info!("checking idempotency");
        let seen = self
            .idempotency
            .exists(&sale.id)
            .await
            .map_err(|e| PipelineError::new(stage, e))?;
        if seen {
            tracing::info!("sale already processed, idempotency marker found");
            return Ok(PipelineOutcome::Duplicate);
        }
        stage = stage.next();

        let record = self
            .sales
            .get(&sale.id)
            .await
            .map_err(|e| PipelineError::new(stage, e))?
            .ok_or_else(|| PipelineError::new(stage, WorkerError::SaleNotFound(sale.id.clone())))?;

        if record.processed {
            tracing::debug!("sale already marked processed");
        } else {
            tracing::info!(
                product = %record.product,
                amount = record.amount,
                "updating processed flag"
            );
            self.sales
                .mark_processed(&record.id)
                .await
                .map_err(|e| PipelineError::new(stage, e))?;
        }
        stage = stage.next();

        let key = sale_key(&sale.id, (self.clock)().date_naive());
        tracing::info!(bucket = %self.bucket, key = %key, "archiving sale");
        self.archive
            .put(&self.bucket, &key, body.as_bytes().to_vec())
            .await
            .map_err(|e| PipelineError::new(stage, e))?;
        stage = stage.next();

        self.idempotency
            .put(&sale.id)
            .await
            .map_err(|e| PipelineError::new(stage, e))?;
        stage = stage.next();

        tracing::info!(%stage, "sale committed to idempotency store");
        Ok(PipelineOutcome::Committed)
    }
}
