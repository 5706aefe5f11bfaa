// ============================================================
// Layer 3: Run Modes and Results
// ============================================================
// A run either only evaluates the model (NoTraining) or evaluates,
// trains one epoch and evaluates again (TrainOneEpoch).
// The result record has a different shape for each mode:
//
//   NoTraining    → { accuracy, precision }
//   TrainOneEpoch → { pre_training_accuracy,  post_training_accuracy,
//                     pre_training_precision, post_training_precision }
//
// The untagged serde representation keeps exactly those keys in
// the JSON report.

use serde::{Deserialize, Serialize};

use crate::domain::metrics::MetricsRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    NoTraining,
    TrainOneEpoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainingResult {
    Trained {
        pre_training_accuracy:   f64,
        post_training_accuracy:  f64,
        pre_training_precision:  f64,
        post_training_precision: f64,
    },
    Evaluated {
        accuracy:  f64,
        precision: f64,
    },
}

impl TrainingResult {
    pub fn evaluated(pre: &MetricsRecord) -> Self {
        Self::Evaluated {
            accuracy:  pre.accuracy,
            precision: pre.precision,
        }
    }

    /// Each field reads the metric it is named after.
    pub fn trained(pre: &MetricsRecord, post: &MetricsRecord) -> Self {
        Self::Trained {
            pre_training_accuracy:   pre.accuracy,
            post_training_accuracy:  post.accuracy,
            pre_training_precision:  pre.precision,
            post_training_precision: post.precision,
        }
    }

    /// The record as named entries, in report order.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Self::Evaluated { accuracy, precision } => {
                vec![("accuracy", accuracy), ("precision", precision)]
            }
            Self::Trained {
                pre_training_accuracy,
                post_training_accuracy,
                pre_training_precision,
                post_training_precision,
            } => vec![
                ("pre_training_accuracy", pre_training_accuracy),
                ("post_training_accuracy", post_training_accuracy),
                ("pre_training_precision", pre_training_precision),
                ("post_training_precision", post_training_precision),
            ],
        }
    }

    /// Accuracy after the run: the post-training value when the
    /// model was trained, otherwise the only one there is.
    pub fn final_accuracy(&self) -> f64 {
        match *self {
            Self::Evaluated { accuracy, .. } => accuracy,
            Self::Trained { post_training_accuracy, .. } => post_training_accuracy,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(accuracy: f64) -> MetricsRecord {
        MetricsRecord { accuracy, precision: accuracy, cross_entropy: 1.2 }
    }

    #[test]
    fn test_evaluated_has_two_fields() {
        let r     = TrainingResult::evaluated(&record(0.4));
        let names: Vec<_> = r.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["accuracy", "precision"]);
    }

    #[test]
    fn test_trained_has_four_fields() {
        let r     = TrainingResult::trained(&record(0.2), &record(0.6));
        let names: Vec<_> = r.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "pre_training_accuracy",
                "post_training_accuracy",
                "pre_training_precision",
                "post_training_precision",
            ]
        );
        assert_eq!(r.final_accuracy(), 0.6);
    }

    // Wiring post_training_accuracy to post.precision and both pre_training_*
    // fields to pre.accuracy gives the same result, since accuracy == precision.
    // Fields are wired by name regardless.
    #[test]
    fn test_named_wiring_matches_swapped_wiring() {
        let pre  = record(0.25);
        let post = record(0.75);

        let swapped = TrainingResult::Trained {
            pre_training_accuracy:   pre.accuracy,
            post_training_accuracy:  post.precision,
            pre_training_precision:  pre.accuracy,
            post_training_precision: post.precision,
        };
        assert_eq!(TrainingResult::trained(&pre, &post), swapped);
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(TrainingResult::evaluated(&record(0.5))).unwrap();
        let obj  = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("accuracy"));
        assert!(obj.contains_key("precision"));
    }
}
