// ============================================================
// Layer 5: Burn Training Engine
// ============================================================
// The TrainingEngine behind the orchestrator, built on Burn's
// DataLoader and AdamW.
//
// Key Burn insight:
//   - Training uses an AutodiffBackend for gradients
//   - model.valid() returns the model on the inner backend
//   - Evaluation batches must also use the inner backend
//   - Frozen parameters (no_grad) simply receive no gradient,
//     so one loop serves every fine-tuning strategy
//
// Evaluation walks the whole held-out set in minibatches and
// concatenates the raw logits; metrics are computed once over
// the concatenation by the domain's MetricsEvaluator.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{
    batcher::{ReviewBatch, ReviewBatcher},
    dataset::ReviewDataset,
};
use crate::domain::{
    error::PeftError,
    metrics::EvalBatch,
    review::TokenizedExample,
    traits::TrainingEngine,
};
use crate::ml::model::ReviewClassifier;

/// Optimiser and loader settings shared by every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingHyperparams {
    pub learning_rate: f64,
    pub batch_size:    usize,
    pub weight_decay:  f64,
    pub shuffle_seed:  u64,
}

impl Default for TrainingHyperparams {
    fn default() -> Self {
        Self {
            learning_rate: 5e-5,
            batch_size:    16,
            weight_decay:  0.01,
            shuffle_seed:  42,
        }
    }
}

pub struct BurnEngine<B: AutodiffBackend> {
    device: B::Device,
    train:  Vec<TokenizedExample>,
    eval:   Vec<TokenizedExample>,
    hyper:  TrainingHyperparams,
}

impl<B: AutodiffBackend> BurnEngine<B> {
    pub fn new(
        device: B::Device,
        train:  Vec<TokenizedExample>,
        eval:   Vec<TokenizedExample>,
        hyper:  TrainingHyperparams,
    ) -> Self {
        Self { device, train, eval, hyper }
    }
}

impl<B: AutodiffBackend> TrainingEngine for BurnEngine<B> {
    type Model = ReviewClassifier<B>;

    fn evaluate(&self, model: &Self::Model) -> Result<EvalBatch, PeftError> {
        // model.valid() → ReviewClassifier<InnerBackend>, dropout disabled
        evaluate_model(&model.valid(), &self.eval, self.hyper.batch_size, &self.device)
    }

    fn train_one_epoch(&mut self, model: Self::Model) -> Result<Self::Model, PeftError> {
        if self.train.is_empty() {
            return Err(PeftError::EngineFailure("training set is empty".into()));
        }
        if self.hyper.batch_size == 0 {
            return Err(PeftError::EngineFailure("batch size must be at least 1".into()));
        }

        let mut model = model;
        let mut optim = AdamWConfig::new()
            .with_weight_decay(self.hyper.weight_decay as f32)
            .init();

        let loader: Arc<dyn DataLoader<B, ReviewBatch<B>>> = DataLoaderBuilder::new(ReviewBatcher::new())
            .batch_size(self.hyper.batch_size)
            .shuffle(self.hyper.shuffle_seed)
            .num_workers(1)
            .set_device(self.device.clone())
            .build(ReviewDataset::new(self.train.clone()));

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            let (loss, _) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(PeftError::EngineFailure(format!(
                    "loss became {loss_val} at batch {}",
                    batches + 1
                )));
            }
            loss_sum += loss_val;
            batches  += 1;

            // Backward pass + AdamW update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(self.hyper.learning_rate, model, grads);
        }

        tracing::info!(
            "Epoch done: {} batches | mean train_loss={:.4}",
            batches,
            loss_sum / batches.max(1) as f64,
        );
        Ok(model)
    }
}

/// Raw logits and labels of `model` over `examples`, in minibatches.
pub fn evaluate_model<B: Backend>(
    model:      &ReviewClassifier<B>,
    examples:   &[TokenizedExample],
    batch_size: usize,
    device:     &B::Device,
) -> Result<EvalBatch, PeftError> {
    if batch_size == 0 {
        return Err(PeftError::EngineFailure("batch size must be at least 1".into()));
    }

    let mut out = EvalBatch::default();
    if examples.is_empty() {
        return Ok(out);
    }

    let loader: Arc<dyn DataLoader<B, ReviewBatch<B>>> = DataLoaderBuilder::new(ReviewBatcher::new())
        .batch_size(batch_size)
        .num_workers(1)
        .set_device(device.clone())
        .build(ReviewDataset::new(examples.to_vec()));

    for batch in loader.iter() {
        let logits = model.forward(batch.input_ids, batch.attention_mask);
        out.extend(EvalBatch::new(
            logits.into_data().iter::<f32>().collect(),
            batch.labels.into_data().iter::<i64>().collect(),
        ));
    }

    if out.len() != examples.len() {
        return Err(PeftError::EngineFailure(format!(
            "evaluation produced {} rows for {} examples",
            out.len(),
            examples.len()
        )));
    }
    Ok(out)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{metrics::MetricsEvaluator, review::NUM_RATING_CLASSES};
    use crate::ml::model::ReviewClassifierConfig;
    use burn::backend::{Autodiff, NdArray};

    type TB = Autodiff<NdArray>;

    fn example(seed: u32, label: i64) -> TokenizedExample {
        let input_ids = vec![101, 104 + seed % 10, 104 + (seed * 3) % 10, 0];
        TokenizedExample {
            text:           format!("review {seed}"),
            label,
            attention_mask: vec![1, 1, 1, 0],
            input_ids,
        }
    }

    fn examples(n: u32) -> Vec<TokenizedExample> {
        (0..n).map(|i| example(i, (i % 5) as i64)).collect()
    }

    fn engine(train: Vec<TokenizedExample>) -> BurnEngine<TB> {
        let hyper = TrainingHyperparams { learning_rate: 1e-3, batch_size: 4, ..Default::default() };
        BurnEngine::new(Default::default(), train, examples(7), hyper)
    }

    fn model() -> ReviewClassifier<TB> {
        ReviewClassifierConfig::new(120, 4, 16, 2, 1, 32)
            .with_dropout(0.0)
            .init(&Default::default())
    }

    #[test]
    fn test_evaluate_covers_every_example() {
        let engine = engine(examples(8));
        let batch  = engine.evaluate(&model()).unwrap();

        assert_eq!(batch.len(), 7);
        assert_eq!(batch.logits.len(), 7 * NUM_RATING_CLASSES);
        let metrics = MetricsEvaluator::new(NUM_RATING_CLASSES).evaluate(&batch).unwrap();
        assert!(metrics.cross_entropy.is_finite());
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let engine = engine(examples(8));
        let model  = model();
        let a = engine.evaluate(&model).unwrap();
        let b = engine.evaluate(&model).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_one_epoch_changes_weights() {
        let mut engine = engine(examples(12));
        let model  = model();
        let before = engine.evaluate(&model).unwrap();
        let model  = engine.train_one_epoch(model).unwrap();
        let after  = engine.evaluate(&model).unwrap();
        assert_ne!(before.logits, after.logits);
    }

    #[test]
    fn test_empty_training_set_is_engine_failure() {
        let mut engine = engine(Vec::new());
        assert!(matches!(
            engine.train_one_epoch(model()),
            Err(PeftError::EngineFailure(_))
        ));
    }

    #[test]
    fn test_empty_eval_set_gives_empty_batch() {
        let device = Default::default();
        let inner  = model().valid();
        let batch  = evaluate_model(&inner, &[], 4, &device).unwrap();
        assert!(batch.is_empty());
    }
}
