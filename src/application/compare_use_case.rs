// ============================================================
// Layer 2: CompareUseCase
// ============================================================
// Runs the full strategy comparison in order:
//
//   Step 1: Validate and save the experiment config  (Layer 6)
//   Step 2: Load and clean the reviews               (Layer 4)
//   Step 3: Build or load the base model             (Layer 5 / 6)
//   Step 4: Build / load the tokenizer and encode    (Layer 4 / 6)
//   Step 5: For each dataset fraction:
//             baseline        → NoTraining run
//             full            → TrainOneEpoch run
//             classifier_only → TrainOneEpoch run
//             lora            → TrainOneEpoch run
//           every run appended to results.csv
//   Step 6: Write comparison.json
//   Step 7: Pick the best variant, reload it from disk and check
//           it reproduces its post-training metrics
//
// Every variant starts from a clone of the same base model and
// exports into its own storage location:
//
//   <storage>/fraction_<pct>/<variant>/exported_model
//
// Reference: Hu et al. (2021) LoRA
//            Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::application::{
    experiment::{ExperimentConfig, ExperimentData},
    orchestrator::{export_dir, RunOutcome, TrainingOrchestrator},
};
use crate::data::{encoder::ReviewEncoder, splitter::fraction_count};
use crate::domain::{
    metrics::{MetricsEvaluator, MetricsRecord},
    outcome::{TrainingMode, TrainingResult},
    review::{TokenizedExample, NUM_RATING_CLASSES},
    strategy::{FineTuneStrategy, VariantPlan},
};
use crate::infra::{
    checkpoint::ModelStore,
    ledger::{select_best, BestVariant, ResultsLedger, VariantSummary},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    default_device,
    engine::{evaluate_model, BurnEngine},
    model::{ReviewClassifier, ReviewClassifierConfig},
    variant, InnerBackend, TrainBackend,
};

/// A reloaded model must reproduce its metrics within this bound.
pub const RELOAD_TOLERANCE: f64 = 1e-6;

const BASELINE: &str = "baseline";
const BASE_MODEL_DIR: &str = "base_model";

/// Everything a comparison produced.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub rows: Vec<VariantSummary>,
    pub best: Option<BestVariant>,

    /// Metrics of the best variant after reloading it from disk
    pub reloaded: Option<MetricsRecord>,
}

pub struct CompareUseCase {
    config: ExperimentConfig,
}

impl CompareUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ComparisonReport> {
        let cfg     = &self.config;
        let storage = PathBuf::from(&cfg.storage_dir);
        let device  = default_device();

        // ── Step 1: Config ───────────────────────────────────────────────────
        cfg.validate()?;
        cfg.save(&storage)?;

        // ── Step 2: Reviews ──────────────────────────────────────────────────
        let data = ExperimentData::load(cfg)?;
        for &fraction in &cfg.fractions {
            if fraction_count(data.train_pool.len(), fraction)? == 0 {
                bail!(
                    "fraction {fraction} of {} training reviews selects no reviews; \
                     use a larger fraction or more data",
                    data.train_pool.len()
                );
            }
        }

        // ── Step 3: Base model (its architecture fixes vocab and length) ─────
        let (base, model_cfg) = self.base_model(&storage, &device)?;

        // ── Step 4: Tokenizer ────────────────────────────────────────────────
        let tokenizer = TokenizerStore::new(&storage)
            .load_or_build(&data.train_texts(), model_cfg.vocab_size)?;
        let encoder   = ReviewEncoder::new(&tokenizer, model_cfg.max_seq_len, model_cfg.vocab_size);
        let train_all = encoder.encode_all(&data.train_pool)?;
        let eval      = encoder.encode_all(&data.eval)?;

        // ── Step 5: Runs ─────────────────────────────────────────────────────
        let ledger     = ResultsLedger::new(&storage);
        let strategies = FineTuneStrategy::comparison_set(cfg.adapter.clone());
        let mut rows   = Vec::new();

        for &fraction in &cfg.fractions {
            let train = data.train_subset(fraction)?;
            let train = train_all[..train.len()].to_vec();
            let dir   = storage.join(fraction_dir_name(fraction));
            tracing::info!(
                "── Fraction {:.2}%: {} train / {} eval reviews ──",
                fraction * 100.0,
                train.len(),
                eval.len()
            );

            // Baseline: the untouched base model, evaluation only
            let base_plan = full_plan(&base);
            let outcome   = self.run(
                base.clone(),
                self.engine(&train, &eval),
                ModelStore::new(model_cfg.clone(), base_plan),
                &dir.join(BASELINE),
                TrainingMode::NoTraining,
            )?;
            log_result(BASELINE, &outcome.result);
            let row = summarize(fraction, BASELINE, &outcome, None, None);
            ledger.append(&row)?;
            rows.push(row);

            for strategy in &strategies {
                tracing::info!("Variant: {}", strategy);
                let (model, plan) = variant::prepare(base.clone(), strategy, &device)?;
                let location      = dir.join(strategy.name());

                let outcome = self
                    .run(
                        model,
                        self.engine(&train, &eval),
                        ModelStore::new(model_cfg.clone(), plan.clone()),
                        &location,
                        TrainingMode::TrainOneEpoch,
                    )
                    .with_context(|| format!("{} run at fraction {fraction} failed", strategy.name()))?;

                log_result(strategy.name(), &outcome.result);
                let row = summarize(
                    fraction,
                    strategy.name(),
                    &outcome,
                    Some(&plan),
                    Some(export_dir(&location)),
                );
                ledger.append(&row)?;
                rows.push(row);
            }
        }

        // ── Step 6: Report ───────────────────────────────────────────────────
        ledger.write_comparison(&rows)?;
        tracing::info!("Wrote '{}'", ledger.comparison_path().display());

        // ── Step 7: Best variant, reloaded from disk ─────────────────────────
        let Some(best_row) = select_best(&rows) else {
            return Ok(ComparisonReport { rows, best: None, reloaded: None });
        };
        let (Some(model_dir), Some(expected)) = (best_row.model_dir.clone(), best_row.post) else {
            bail!("best variant '{}' has no exported model", best_row.variant);
        };

        let best = BestVariant {
            fraction:  best_row.fraction,
            variant:   best_row.variant.clone(),
            accuracy:  best_row.final_accuracy(),
            model_dir: model_dir.clone(),
        };
        ledger.write_best(&best)?;
        tracing::info!(
            "Best variant: {} at fraction {:.2}% (accuracy={:.4})",
            best.variant,
            best.fraction * 100.0,
            best.accuracy
        );

        let reloaded = reload_metrics(&model_dir, &eval, cfg.batch_size)?;
        if !reloaded.approx_eq(&expected, RELOAD_TOLERANCE) {
            bail!(
                "reloaded '{}' does not reproduce its metrics: expected {:?}, got {:?}",
                model_dir.display(),
                expected,
                reloaded
            );
        }
        tracing::info!("Reloaded best variant reproduces its metrics");

        Ok(ComparisonReport { rows, best: Some(best), reloaded: Some(reloaded) })
    }

    /// Load `--base-model` or initialise (and save) a fresh one.
    fn base_model(
        &self,
        storage: &Path,
        device:  &<TrainBackend as burn::prelude::Backend>::Device,
    ) -> Result<(ReviewClassifier<TrainBackend>, ReviewClassifierConfig)> {
        if let Some(dir) = &self.config.base_model {
            let (model, model_cfg) = ModelStore::load_base::<TrainBackend>(Path::new(dir), device)
                .with_context(|| format!("Cannot load base model from '{dir}'"))?;
            return Ok((model, model_cfg));
        }

        let model_cfg = self.config.model_config();
        let model     = model_cfg.init::<TrainBackend>(device);
        let base_dir  = storage.join(BASE_MODEL_DIR);
        ModelStore::new(model_cfg.clone(), full_plan(&model)).save(&model, &base_dir)?;
        tracing::info!(
            "Initialised base model: {} layers, d_model={}, saved to '{}'",
            model_cfg.num_layers,
            model_cfg.d_model,
            base_dir.display()
        );
        Ok((model, model_cfg))
    }

    fn engine(&self, train: &[TokenizedExample], eval: &[TokenizedExample]) -> BurnEngine<TrainBackend> {
        BurnEngine::new(default_device(), train.to_vec(), eval.to_vec(), self.config.hyperparams())
    }

    fn run(
        &self,
        model:    ReviewClassifier<TrainBackend>,
        engine:   BurnEngine<TrainBackend>,
        exporter: ModelStore,
        location: &Path,
        mode:     TrainingMode,
    ) -> Result<RunOutcome<ReviewClassifier<TrainBackend>>> {
        let evaluator = MetricsEvaluator::new(NUM_RATING_CLASSES);
        let mut orchestrator = TrainingOrchestrator::new(engine, exporter, evaluator);
        Ok(orchestrator.run(model, location, mode)?)
    }
}

/// Evaluate an exported variant straight from disk.
pub fn reload_metrics(
    model_dir:  &Path,
    eval:       &[TokenizedExample],
    batch_size: usize,
) -> Result<MetricsRecord> {
    let device        = default_device();
    let (model, _)    = ModelStore::load::<InnerBackend>(model_dir, &device)?;
    let batch         = evaluate_model(&model, eval, batch_size, &device)?;
    Ok(MetricsEvaluator::new(NUM_RATING_CLASSES).evaluate(&batch)?)
}

fn full_plan<B: burn::prelude::Backend>(model: &ReviewClassifier<B>) -> VariantPlan {
    use burn::module::Module;
    let n = model.num_params();
    VariantPlan {
        strategy:         FineTuneStrategy::FullyTrainable,
        trainable_params: n,
        total_params:     n,
    }
}

fn log_result(variant: &str, result: &TrainingResult) {
    let fields: Vec<String> = result
        .fields()
        .iter()
        .map(|(name, value)| format!("{name}={value:.4}"))
        .collect();
    tracing::info!("{variant}: {}", fields.join(" "));
}

fn summarize<M>(
    fraction:  f64,
    variant:   &str,
    outcome:   &RunOutcome<M>,
    plan:      Option<&VariantPlan>,
    model_dir: Option<PathBuf>,
) -> VariantSummary {
    VariantSummary {
        fraction,
        variant:          variant.to_string(),
        result:           outcome.result,
        pre:              outcome.pre,
        post:             outcome.post,
        trainable_params: plan.map(|p| p.trainable_params),
        total_params:     plan.map(|p| p.total_params),
        model_dir,
    }
}

/// `0.01` → `fraction_1`, `0.005` → `fraction_0_5`
pub fn fraction_dir_name(fraction: f64) -> String {
    let pct = (fraction * 100.0 * 1e4).round() / 1e4;
    format!("fraction_{pct}").replace('.', "_")
}
