// ============================================================
// Layer 3: Domain Errors
// ============================================================
// Every failure the evaluation and orchestration core can raise.
// The application layer wraps these in anyhow with context;
// nothing in the core retries or swallows them.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeftError {
    /// Logits and labels disagree on the number of examples,
    /// or the flat logits buffer is not a whole number of rows.
    #[error("shape mismatch: {logits_len} logits for {labels} labels with {num_classes} classes")]
    ShapeMismatch {
        logits_len:  usize,
        labels:      usize,
        num_classes: usize,
    },

    /// A ground-truth label outside `[0, num_classes - 1]`.
    #[error("invalid label {label} at index {index}: expected 0..{num_classes}")]
    InvalidLabel {
        index:       usize,
        label:       i64,
        num_classes: usize,
    },

    /// The trained model could not be written to (or read back from) storage.
    #[error("storage failure at '{}': {reason}", path.display())]
    StorageFailure { path: PathBuf, reason: String },

    /// Opaque failure from the training engine, propagated as-is.
    #[error("training engine failure: {0}")]
    EngineFailure(String),

    /// A fine-tuning strategy that cannot be applied to the model.
    #[error("invalid fine-tuning strategy: {0}")]
    InvalidStrategy(String),

    /// Unreadable or malformed dataset input.
    #[error("dataset error: {0}")]
    Dataset(String),
}

impl PeftError {
    pub fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StorageFailure {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }
}
