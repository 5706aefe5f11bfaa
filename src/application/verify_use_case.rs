// ============================================================
// Layer 2: VerifyUseCase
// ============================================================
// Reloads an exported variant from disk, with no other state
// from the run that produced it, and re-evaluates it:
//
//   Step 1: Read <storage>/experiment.json          (Layer 2)
//   Step 2: Pick the model directory: --model-dir,
//           or the one recorded in best_variant.json (Layer 6)
//   Step 3: Rebuild the variant from variant.json
//           and load its weights                     (Layer 6)
//   Step 4: Re-select and re-tokenise the eval set
//           with the stored tokenizer                (Layer 4 / 6)
//   Step 5: Evaluate and score                       (Layer 5 / 3)

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::experiment::{ExperimentConfig, ExperimentData};
use crate::data::encoder::ReviewEncoder;
use crate::domain::{
    metrics::{MetricsEvaluator, MetricsRecord},
    review::NUM_RATING_CLASSES,
    strategy::VariantPlan,
};
use crate::infra::{checkpoint::ModelStore, ledger::ResultsLedger, tokenizer_store::TokenizerStore};
use crate::ml::{default_device, engine::evaluate_model, InnerBackend};

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub storage_dir:   String,
    pub model_dir:     Option<String>,
    pub data_dir:      Option<String>,
    pub eval_fraction: Option<f64>,
}

/// What `verify` found.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub model_dir:     PathBuf,
    pub plan:          VariantPlan,
    pub eval_examples: usize,
    pub metrics:       MetricsRecord,
}

pub struct VerifyUseCase {
    request: VerifyRequest,
}

impl VerifyUseCase {
    pub fn new(request: VerifyRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<VerifyReport> {
        let req     = &self.request;
        let storage = PathBuf::from(&req.storage_dir);

        // ── Step 1: Experiment config, with overrides ────────────────────────
        let mut cfg = ExperimentConfig::load(&storage)?;
        if let Some(dir) = &req.data_dir {
            cfg.data_dir = dir.clone();
        }
        if let Some(f) = req.eval_fraction {
            cfg.eval_fraction = f;
        }

        // ── Step 2: Which model ──────────────────────────────────────────────
        let model_dir = match &req.model_dir {
            Some(dir) => PathBuf::from(dir),
            None => ResultsLedger::new(&storage).read_best()?.model_dir,
        };

        // ── Step 3: Rebuild the variant ──────────────────────────────────────
        let device = default_device();
        let (model, manifest) = ModelStore::load::<InnerBackend>(&model_dir, &device)
            .with_context(|| format!("Cannot reload variant from '{}'", model_dir.display()))?;
        tracing::info!("Reloaded variant: {}", manifest.plan.strategy);

        // ── Step 4: Eval set ─────────────────────────────────────────────────
        let data      = ExperimentData::load(&cfg)?;
        let tokenizer = TokenizerStore::new(&storage).load()?;
        let encoder   = ReviewEncoder::new(&tokenizer, manifest.model.max_seq_len, manifest.model.vocab_size);
        let eval      = encoder.encode_all(&data.eval)?;

        // ── Step 5: Evaluate ─────────────────────────────────────────────────
        let batch   = evaluate_model(&model, &eval, cfg.batch_size, &device)?;
        let metrics = MetricsEvaluator::new(manifest.model.num_classes).evaluate(&batch)?;
        tracing::info!(
            "verify: {} examples | accuracy={:.4} | precision={:.4} | cross_entropy={:.4}",
            batch.len(),
            metrics.accuracy,
            metrics.precision,
            metrics.cross_entropy,
        );

        if manifest.model.num_classes != NUM_RATING_CLASSES {
            tracing::warn!(
                "Model has {} classes, reviews use {}",
                manifest.model.num_classes,
                NUM_RATING_CLASSES
            );
        }

        Ok(VerifyReport {
            model_dir,
            plan: manifest.plan,
            eval_examples: eval.len(),
            metrics,
        })
    }
}
