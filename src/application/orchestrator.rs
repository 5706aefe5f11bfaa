// ============================================================
// Layer 2: TrainingOrchestrator
// ============================================================
// Runs one model variant through the experiment pipeline:
//
//   Step 1: Evaluate on the held-out set          → pre
//   Step 2: NoTraining? return {accuracy, precision} and stop
//   Step 3: Train exactly one epoch               (engine)
//   Step 4: Evaluate again                        → post
//   Step 5: Export to <storage>/exported_model    (exporter)
//   Step 6: Return the four-field result
//
// The orchestrator never retries. Any failure aborts the run and
// reaches the caller unchanged; there is no partial result.
//
// It is generic over the engine and exporter so the same code
// drives every variant (full, classifier-only, adapter) and can be
// tested with fakes.

use std::path::{Path, PathBuf};

use crate::domain::{
    error::PeftError,
    metrics::{MetricsEvaluator, MetricsRecord},
    outcome::{TrainingMode, TrainingResult},
    traits::{ModelExporter, TrainingEngine},
};

/// Subdirectory of a run's storage location holding the trained model.
pub const EXPORT_SUBDIR: &str = "exported_model";

/// Where `run` exports the model for a given storage location.
pub fn export_dir(storage_location: &Path) -> PathBuf {
    storage_location.join(EXPORT_SUBDIR)
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutcome<M> {
    /// Normalised two- or four-field record
    pub result: TrainingResult,

    /// Metrics before any training
    pub pre: MetricsRecord,

    /// Metrics after the training epoch, if one ran
    pub post: Option<MetricsRecord>,

    /// The model as it stands after the run
    pub model: M,
}

pub struct TrainingOrchestrator<E, X> {
    engine:    E,
    exporter:  X,
    evaluator: MetricsEvaluator,
}

impl<E, X> TrainingOrchestrator<E, X>
where
    E: TrainingEngine,
    X: ModelExporter<E::Model>,
{
    pub fn new(engine: E, exporter: X, evaluator: MetricsEvaluator) -> Self {
        Self { engine, exporter, evaluator }
    }

    pub fn run(
        &mut self,
        model:            E::Model,
        storage_location: &Path,
        mode:             TrainingMode,
    ) -> Result<RunOutcome<E::Model>, PeftError> {
        // ── Step 1: Baseline evaluation ──────────────────────────────────────
        let pre = self.evaluate_pass(&model, "pre-training")?;

        // ── Step 2: Evaluation-only runs stop here and touch no files ────────
        if mode == TrainingMode::NoTraining {
            return Ok(RunOutcome {
                result: TrainingResult::evaluated(&pre),
                pre,
                post: None,
                model,
            });
        }

        // ── Step 3: One epoch ────────────────────────────────────────────────
        tracing::info!("Training one epoch");
        let model = self.engine.train_one_epoch(model)?;

        // ── Step 4: Post-training evaluation ─────────────────────────────────
        let post = self.evaluate_pass(&model, "post-training")?;

        // ── Step 5: Export ───────────────────────────────────────────────────
        let dir = export_dir(storage_location);
        self.exporter.export(&model, &dir)?;
        tracing::info!("Exported trained model to '{}'", dir.display());

        Ok(RunOutcome {
            result: TrainingResult::trained(&pre, &post),
            pre,
            post: Some(post),
            model,
        })
    }

    fn evaluate_pass(&self, model: &E::Model, stage: &str) -> Result<MetricsRecord, PeftError> {
        let batch   = self.engine.evaluate(model)?;
        if batch.is_empty() {
            tracing::warn!("{stage}: evaluation set is empty, every metric is 0");
        }
        let metrics = self.evaluator.evaluate(&batch)?;
        tracing::info!(
            "{stage}: {} examples | accuracy={:.4} | precision={:.4} | cross_entropy={:.4}",
            batch.len(),
            metrics.accuracy,
            metrics.precision,
            metrics.cross_entropy,
        );
        Ok(metrics)
    }
}
