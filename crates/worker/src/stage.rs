//! Pipeline stages.

/// The stages a message moves through.
///
/// ```text
/// Received ──► GateChecked ──► IdempotencyChecked ──► Updated ──► Archived ──► Committed
/// ```
///
/// A message that fails stays at the last stage it reached and is retried
/// from the beginning on redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PipelineStage {
    /// Message taken off the queue.
    #[default]
    Received,

    /// Site state is active; side effects are allowed.
    GateChecked,

    /// Payload decoded and no idempotency marker found.
    IdempotencyChecked,

    /// Sale marked processed in the sale store.
    Updated,

    /// Raw message written to the archive.
    Archived,

    /// Idempotency marker written (terminal state).
    Committed,
}

impl PipelineStage {
    /// Returns the stage that follows this one. `Committed` is terminal.
    pub fn next(self) -> PipelineStage {
        match self {
            PipelineStage::Received => PipelineStage::GateChecked,
            PipelineStage::GateChecked => PipelineStage::IdempotencyChecked,
            PipelineStage::IdempotencyChecked => PipelineStage::Updated,
            PipelineStage::Updated => PipelineStage::Archived,
            PipelineStage::Archived | PipelineStage::Committed => PipelineStage::Committed,
        }
    }

    /// Returns the stage name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "Received",
            PipelineStage::GateChecked => "GateChecked",
            PipelineStage::IdempotencyChecked => "IdempotencyChecked",
            PipelineStage::Updated => "Updated",
            PipelineStage::Archived => "Archived",
            PipelineStage::Committed => "Committed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
