// ============================================================
// Layer 2: Experiment Configuration and Data Selection
// ============================================================
// ExperimentConfig holds every knob of a comparison run. It is
// written to <storage>/experiment.json when `compare` starts, so
// `verify` can later rebuild exactly the same evaluation set.
//
// Review selection:
//
//   test.jsonl present → train pool = all of train.jsonl
//                        eval set   = first eval_fraction of test.jsonl
//   test.jsonl absent  → seeded holdout of HOLDOUT_FRACTION carved
//                        from train.jsonl; eval set = first
//                        eval_fraction of that holdout
//
// Each dataset-size fraction then trains on the first X% of the
// train pool. All text is cleaned before tokenisation.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{
    loader::JsonlReviewLoader,
    preprocessor::Preprocessor,
    splitter::{split_holdout, take_fraction},
};
use crate::domain::{
    review::LabeledExample,
    strategy::AdapterConfig,
    traits::{ReviewSource, Split},
};
use crate::infra::tokenizer_store::FIRST_WORD_ID;
use crate::ml::{engine::TrainingHyperparams, model::ReviewClassifierConfig};

/// Share of train.jsonl held out when there is no test.jsonl.
pub const HOLDOUT_FRACTION: f64 = 0.1;

const CONFIG_FILE: &str = "experiment.json";

// ─── Experiment Configuration ────────────────────────────────────────────────
// Serialisable so it can be saved next to the results and reloaded by `verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub data_dir:      String,
    pub storage_dir:   String,
    pub fractions:     Vec<f64>,
    pub eval_fraction: f64,
    pub max_seq_len:   usize,
    pub batch_size:    usize,
    pub lr:            f64,
    pub weight_decay:  f64,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    pub dropout:       f64,
    pub vocab_size:    usize,
    pub adapter:       AdapterConfig,
    pub base_model:    Option<String>,
    pub seed:          u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_dir:      "data/reviews".to_string(),
            storage_dir:   "storage".to_string(),
            fractions:     vec![0.01, 0.1],
            eval_fraction: 1.0,
            max_seq_len:   128,
            batch_size:    16,
            lr:            5e-5,
            weight_decay:  0.01,
            d_model:       128,
            num_heads:     4,
            num_layers:    2,
            d_ff:          512,
            dropout:       0.1,
            vocab_size:    30522,
            adapter:       AdapterConfig::default(),
            base_model:    None,
            seed:          42,
        }
    }
}

impl ExperimentConfig {
    /// Catch bad settings before any data is read or model built.
    pub fn validate(&self) -> Result<()> {
        if self.fractions.is_empty() {
            bail!("at least one dataset fraction is required");
        }
        for &f in self.fractions.iter().chain(std::iter::once(&self.eval_fraction)) {
            if !(f > 0.0 && f <= 1.0) {
                bail!("fractions must be in (0, 1], got {f}");
            }
        }
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if self.max_seq_len == 0 {
            bail!("max_seq_len must be at least 1");
        }
        // The encoder always emits [CLS] and the other reserved ids
        if self.vocab_size < FIRST_WORD_ID as usize {
            bail!(
                "vocab_size ({}) must cover the reserved token ids (at least {FIRST_WORD_ID})",
                self.vocab_size
            );
        }
        if self.d_model == 0 {
            bail!("d_model must be at least 1");
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            bail!("d_model ({}) must be divisible by num_heads ({})", self.d_model, self.num_heads);
        }
        self.adapter.validate()?;
        Ok(())
    }

    /// Architecture of a freshly initialised base model.
    pub fn model_config(&self) -> ReviewClassifierConfig {
        ReviewClassifierConfig::new(
            self.vocab_size, self.max_seq_len, self.d_model,
            self.num_heads, self.num_layers, self.d_ff,
        )
        .with_dropout(self.dropout)
    }

    pub fn hyperparams(&self) -> TrainingHyperparams {
        TrainingHyperparams {
            learning_rate: self.lr,
            batch_size:    self.batch_size,
            weight_decay:  self.weight_decay,
            shuffle_seed:  self.seed,
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'compare' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Review Selection ────────────────────────────────────────────────────────
/// Cleaned reviews an experiment draws from.
#[derive(Debug, Clone)]
pub struct ExperimentData {
    /// Every training review, in file (or seeded) order
    pub train_pool: Vec<LabeledExample>,

    /// The fixed held-out evaluation set
    pub eval: Vec<LabeledExample>,
}

impl ExperimentData {
    pub fn load(cfg: &ExperimentConfig) -> Result<Self> {
        let loader = JsonlReviewLoader::new(&cfg.data_dir);

        let (train_pool, eval) = if loader.has_split(Split::Test) {
            let train = loader.load_split(Split::Train, 1.0)?;
            let test  = loader.load_split(Split::Test, cfg.eval_fraction)?;
            (train, test)
        } else {
            tracing::info!(
                "No test split in '{}', holding out {:.0}% of train (seed {})",
                cfg.data_dir,
                HOLDOUT_FRACTION * 100.0,
                cfg.seed,
            );
            let all = loader.load_split(Split::Train, 1.0)?;
            let (train, holdout) = split_holdout(all, HOLDOUT_FRACTION, cfg.seed);
            (train, take_fraction(holdout, cfg.eval_fraction)?)
        };

        let prep  = Preprocessor::new();
        let clean = |examples: Vec<LabeledExample>| -> Vec<LabeledExample> {
            examples
                .into_iter()
                .map(|ex| LabeledExample::new(prep.clean(&ex.text), ex.label))
                .collect()
        };

        let data = Self { train_pool: clean(train_pool), eval: clean(eval) };
        tracing::info!(
            "Experiment data: {} train reviews, {} eval reviews",
            data.train_pool.len(),
            data.eval.len()
        );
        Ok(data)
    }

    /// The first `fraction` of the training pool.
    pub fn train_subset(&self, fraction: f64) -> Result<Vec<LabeledExample>> {
        Ok(take_fraction(self.train_pool.clone(), fraction)?)
    }

    pub fn train_texts(&self) -> Vec<String> {
        self.train_pool.iter().map(|ex| ex.text.clone()).collect()
    }
}
