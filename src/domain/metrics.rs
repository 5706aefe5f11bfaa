// ============================================================
// Layer 3: Evaluation Metrics
// ============================================================
// Turns one evaluation pass (logits + ground-truth labels) into
// the three numbers every run reports:
//
//   accuracy      = correct predictions / N
//   precision     = Σ_c TP(c) / Σ_c (TP(c) + FP(c))   (micro-averaged)
//   cross_entropy = mean_i -log softmax(logits_i)[label_i]
//
// Every example predicts exactly one class, so each prediction is
// either a TP for its class or an FP for its class. The micro
// denominator is therefore N and precision always equals accuracy.
// The per-class counts are still computed so the definition stays
// visible in the code.
//
// Pure Rust: no tensors, no I/O. The ML layer flattens its logits
// into an EvalBatch before calling in here.

use serde::{Deserialize, Serialize};

use crate::domain::error::PeftError;

// ─── EvalBatch ────────────────────────────────────────────────────────────────
/// Model outputs for one full evaluation pass.
///
/// `logits` is row-major `[N, num_classes]`, `labels` is `[N]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalBatch {
    pub logits: Vec<f32>,
    pub labels: Vec<i64>,
}

impl EvalBatch {
    pub fn new(logits: Vec<f32>, labels: Vec<i64>) -> Self {
        Self { logits, labels }
    }

    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Append the outputs of another minibatch.
    ///
    /// Scoring the concatenation is the same as weighting each
    /// minibatch by its example count, so a short final minibatch
    /// does not skew the pass.
    pub fn extend(&mut self, other: EvalBatch) {
        self.logits.extend(other.logits);
        self.labels.extend(other.labels);
    }
}

// ─── MetricsRecord ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Fraction of examples whose argmax matches the label, in [0, 1]
    pub accuracy: f64,

    /// Micro-averaged precision, in [0, 1]
    pub precision: f64,

    /// Mean negative log-likelihood of the true class, >= 0
    pub cross_entropy: f64,
}

impl MetricsRecord {
    /// Value reported for an empty evaluation set.
    pub const EMPTY: MetricsRecord = MetricsRecord {
        accuracy:      0.0,
        precision:     0.0,
        cross_entropy: 0.0,
    };

    /// True when every field is within `tolerance` of `other`.
    pub fn approx_eq(&self, other: &MetricsRecord, tolerance: f64) -> bool {
        (self.accuracy - other.accuracy).abs() <= tolerance
            && (self.precision - other.precision).abs() <= tolerance
            && (self.cross_entropy - other.cross_entropy).abs() <= tolerance
    }
}

// ─── MetricsEvaluator ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct MetricsEvaluator {
    num_classes: usize,
}

impl MetricsEvaluator {
    pub fn new(num_classes: usize) -> Self {
        Self { num_classes }
    }

    /// Score one evaluation pass.
    ///
    /// An empty batch scores `MetricsRecord::EMPTY` (all zeros)
    /// instead of dividing by zero.
    ///
    /// # Errors
    /// * `ShapeMismatch` if `logits` is not exactly `[labels.len(), num_classes]`
    /// * `InvalidLabel` if a label falls outside `[0, num_classes - 1]`
    pub fn evaluate(&self, batch: &EvalBatch) -> Result<MetricsRecord, PeftError> {
        let n = batch.labels.len();
        let c = self.num_classes;

        if c == 0 || batch.logits.len() != n * c {
            return Err(PeftError::ShapeMismatch {
                logits_len:  batch.logits.len(),
                labels:      n,
                num_classes: c,
            });
        }

        for (index, &label) in batch.labels.iter().enumerate() {
            if label < 0 || label as usize >= c {
                return Err(PeftError::InvalidLabel { index, label, num_classes: c });
            }
        }

        if n == 0 {
            return Ok(MetricsRecord::EMPTY);
        }

        let mut correct         = 0usize;
        let mut true_positives  = vec![0usize; c];
        let mut false_positives = vec![0usize; c];
        let mut nll_sum         = 0.0f64;

        for (row, &label) in batch.logits.chunks_exact(c).zip(&batch.labels) {
            let label     = label as usize;
            let predicted = argmax(row);

            if predicted == label {
                correct += 1;
                true_positives[predicted] += 1;
            } else {
                false_positives[predicted] += 1;
            }

            nll_sum -= log_softmax_at(row, label);
        }

        let tp: usize = true_positives.iter().sum();
        let fp: usize = false_positives.iter().sum();

        Ok(MetricsRecord {
            accuracy:      correct as f64 / n as f64,
            precision:     if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 },
            cross_entropy: nll_sum / n as f64,
        })
    }
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(row: &[f32]) -> usize {
    let mut best = 0usize;
    for (i, &v) in row.iter().enumerate().skip(1) {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// `log softmax(row)[index]`, shifted by the row max so large
/// logits cannot overflow `exp`.
fn log_softmax_at(row: &[f32], index: usize) -> f64 {
    let max = row
        .iter()
        .map(|&v| v as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let sum_exp: f64 = row.iter().map(|&v| (v as f64 - max).exp()).sum();
    (row[index] as f64 - max) - sum_exp.ln()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn naive_nll(row: &[f32], label: usize) -> f64 {
        let exps: Vec<f64> = row.iter().map(|&v| (v as f64).exp()).collect();
        let total: f64 = exps.iter().sum();
        -(exps[label] / total).ln()
    }

    #[test]
    fn test_accuracy_equals_precision() {
        let eval  = MetricsEvaluator::new(5);
        let batch = EvalBatch::new(
            vec![
                0.1, 2.0, 0.3, 0.0, 0.0, // → 1
                3.0, 0.2, 0.1, 0.0, 0.4, // → 0
                0.0, 0.0, 0.0, 0.0, 9.0, // → 4
                0.5, 0.1, 1.5, 0.2, 0.3, // → 2
            ],
            vec![1, 3, 4, 0],
        );
        let m = eval.evaluate(&batch).unwrap();
        assert!((m.accuracy - 0.5).abs() < TOL);
        assert!((m.accuracy - m.precision).abs() < TOL);
    }

    #[test]
    fn test_accuracy_equals_precision_on_random_batches() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(17);
        let eval    = MetricsEvaluator::new(5);
        for _ in 0..200 {
            let n      = rng.gen_range(1..40);
            let logits = (0..n * 5).map(|_| rng.gen_range(-4.0f32..4.0)).collect();
            let labels = (0..n).map(|_| rng.gen_range(0..5i64)).collect();

            let m = eval.evaluate(&EvalBatch::new(logits, labels)).unwrap();
            assert_eq!(m.accuracy, m.precision);
            assert!((0.0..=1.0).contains(&m.accuracy));
            assert!(m.cross_entropy.is_finite() && m.cross_entropy >= 0.0);
        }
    }

    #[test]
    fn test_all_correct() {
        let eval = MetricsEvaluator::new(5);
        let rows = [
            [2.0f32, 0.5, 0.1, -1.0, 0.0],
            [0.0, 0.0, 1.5, 0.2, 0.1],
            [-0.3, 0.1, 0.2, 0.3, 0.9],
        ];
        let labels = vec![0i64, 2, 4];
        let batch  = EvalBatch::new(rows.concat(), labels.clone());

        let m = eval.evaluate(&batch).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);

        let expected: f64 = rows
            .iter()
            .zip(&labels)
            .map(|(r, &l)| naive_nll(r, l as usize))
            .sum::<f64>()
            / rows.len() as f64;
        assert!((m.cross_entropy - expected).abs() < TOL);
    }

    #[test]
    fn test_all_wrong_with_two_classes_present() {
        let eval  = MetricsEvaluator::new(5);
        // Predictions are always the other of classes 0 and 1
        let batch = EvalBatch::new(
            vec![
                0.0, 1.0, 0.0, 0.0, 0.0,
                1.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 3.0, 0.0, 0.0, 0.0,
            ],
            vec![0, 1, 0],
        );
        let m = eval.evaluate(&batch).unwrap();
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.precision, 0.0);
        assert!(m.cross_entropy > 0.0);
    }

    #[test]
    fn test_argmax_ties_pick_lowest_index() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1, 0.1, 0.1]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.1, 0.1]), 1);

        let eval  = MetricsEvaluator::new(5);
        let batch = EvalBatch::new(vec![0.5, 0.5, 0.1, 0.1, 0.1], vec![0]);
        assert_eq!(eval.evaluate(&batch).unwrap().accuracy, 1.0);
    }

    #[test]
    fn test_empty_batch_reports_zeros() {
        let eval = MetricsEvaluator::new(5);
        let m    = eval.evaluate(&EvalBatch::default()).unwrap();
        assert_eq!(m, MetricsRecord::EMPTY);
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let eval  = MetricsEvaluator::new(5);
        let batch = EvalBatch::new(vec![1000.0, -1000.0, 500.0, 0.0, 999.0], vec![4]);
        let m     = eval.evaluate(&batch).unwrap();
        assert!(m.cross_entropy.is_finite());
        assert!((m.cross_entropy - (1.0 + (-1.0f64).exp().ln_1p())).abs() < 1e-3);
    }

    #[test]
    fn test_shape_mismatch() {
        let eval  = MetricsEvaluator::new(5);
        let batch = EvalBatch::new(vec![0.0; 10], vec![0, 1, 2]);
        assert!(matches!(
            eval.evaluate(&batch),
            Err(PeftError::ShapeMismatch { labels: 3, .. })
        ));

        let ragged = EvalBatch::new(vec![0.0; 7], vec![0]);
        assert!(matches!(eval.evaluate(&ragged), Err(PeftError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_invalid_label() {
        let eval = MetricsEvaluator::new(5);

        let too_big = EvalBatch::new(vec![0.0; 10], vec![0, 5]);
        assert!(matches!(
            eval.evaluate(&too_big),
            Err(PeftError::InvalidLabel { index: 1, label: 5, .. })
        ));

        let negative = EvalBatch::new(vec![0.0; 5], vec![-1]);
        assert!(matches!(eval.evaluate(&negative), Err(PeftError::InvalidLabel { .. })));
    }

    #[test]
    fn test_extend_matches_single_pass() {
        let eval = MetricsEvaluator::new(5);
        let logits = vec![
            1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0,
        ];
        let whole = EvalBatch::new(logits.clone(), vec![0, 1, 4]);

        // Uneven minibatches: 2 examples then 1
        let mut pieces = EvalBatch::new(logits[..10].to_vec(), vec![0, 1]);
        pieces.extend(EvalBatch::new(logits[10..].to_vec(), vec![4]));

        let a = eval.evaluate(&whole).unwrap();
        let b = eval.evaluate(&pieces).unwrap();
        assert!(a.approx_eq(&b, TOL));
        assert!((a.accuracy - 2.0 / 3.0).abs() < TOL);
    }
}
