// ============================================================
// Layer 3: Core Traits (Collaborator Contracts)
// ============================================================
// The orchestrator only knows these contracts. The burn-backed
// implementations live in Layer 5 (ml) and Layer 6 (infra); the
// orchestrator tests use small fakes instead, so the run logic is
// checked without any ML backend.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use crate::domain::{error::PeftError, metrics::EvalBatch, review::LabeledExample};

// ─── ReviewSource ─────────────────────────────────────────────────────────────
/// Which half of the dataset to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test  => "test",
        }
    }
}

/// Anything that can hand out labelled reviews.
///
/// Must be deterministic: the same split and fraction always
/// return the same examples in the same order.
pub trait ReviewSource {
    /// Return the first `fraction` (0 < fraction <= 1) of `split`.
    fn load_split(&self, split: Split, fraction: f64) -> Result<Vec<LabeledExample>, PeftError>;

    /// Whether `split` exists at all.
    fn has_split(&self, split: Split) -> bool;
}

// ─── TrainingEngine ───────────────────────────────────────────────────────────
/// Runs forward/backward passes for one model type.
///
/// Batching, shuffling, loss and optimiser choice all live behind
/// this trait. Failures come back as `PeftError::EngineFailure`.
pub trait TrainingEngine {
    type Model;

    /// One full pass over the held-out set, returning raw outputs.
    fn evaluate(&self, model: &Self::Model) -> Result<EvalBatch, PeftError>;

    /// Exactly one epoch over the training set.
    fn train_one_epoch(&mut self, model: Self::Model) -> Result<Self::Model, PeftError>;
}

// ─── ModelExporter ────────────────────────────────────────────────────────────
/// Writes a model's current parameters so it can be reloaded later
/// as the same variant, without any in-memory state.
pub trait ModelExporter<M> {
    fn export(&self, model: &M, dir: &Path) -> Result<(), PeftError>;
}
