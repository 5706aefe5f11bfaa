// ============================================================
// Layer 6: Results Ledger
// ============================================================
// Records every run of a comparison to the storage root.
//
//   results.csv       one row per run, appended across experiments
//   comparison.json   all rows of the latest experiment
//   best_variant.json the selected variant and where it was exported
//
// Example CSV output:
//   fraction,variant,trained,pre_accuracy,pre_precision,pre_cross_entropy,...
//   0.0100,baseline,false,0.200000,0.200000,1.611204,,,,,
//   0.0100,full,true,0.200000,0.200000,1.611204,0.412000,0.412000,1.402100,1205,1205
//
// Untrained rows leave the post-training and parameter columns empty.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::{metrics::MetricsRecord, outcome::TrainingResult};

const CSV_FILE: &str = "results.csv";
const COMPARISON_FILE: &str = "comparison.json";
const BEST_FILE: &str = "best_variant.json";

const CSV_HEADER: &str = "fraction,variant,trained,\
    pre_accuracy,pre_precision,pre_cross_entropy,\
    post_accuracy,post_precision,post_cross_entropy,\
    trainable_params,total_params";

/// One row of the comparison report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    /// Share of the training split used (0 < fraction <= 1)
    pub fraction: f64,

    /// `baseline`, `full`, `classifier_only` or `lora`
    pub variant: String,

    /// The orchestrator's two- or four-field record
    pub result: TrainingResult,

    pub pre: MetricsRecord,

    /// Absent for the untrained baseline
    pub post: Option<MetricsRecord>,

    pub trainable_params: Option<usize>,
    pub total_params:     Option<usize>,

    /// Export directory, for trained variants
    pub model_dir: Option<PathBuf>,
}

impl VariantSummary {
    /// Accuracy the variant ended with.
    pub fn final_accuracy(&self) -> f64 {
        self.result.final_accuracy()
    }

    fn csv_row(&self) -> String {
        let opt_f = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
        let opt_u = |v: Option<usize>| v.map(|x| x.to_string()).unwrap_or_default();
        format!(
            "{:.4},{},{},{:.6},{:.6},{:.6},{},{},{},{},{}",
            self.fraction,
            self.variant,
            self.post.is_some(),
            self.pre.accuracy,
            self.pre.precision,
            self.pre.cross_entropy,
            opt_f(self.post.map(|m| m.accuracy)),
            opt_f(self.post.map(|m| m.precision)),
            opt_f(self.post.map(|m| m.cross_entropy)),
            opt_u(self.trainable_params),
            opt_u(self.total_params),
        )
    }
}

/// The variant picked at the end of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestVariant {
    pub fraction:  f64,
    pub variant:   String,
    pub accuracy:  f64,
    pub model_dir: PathBuf,
}

/// First trained row with the highest post-training accuracy.
/// Earlier rows win ties.
pub fn select_best(rows: &[VariantSummary]) -> Option<&VariantSummary> {
    rows.iter()
        .filter(|r| r.post.is_some() && r.model_dir.is_some())
        .fold(None, |best: Option<&VariantSummary>, row| match best {
            Some(b) if b.final_accuracy() >= row.final_accuracy() => Some(b),
            _ => Some(row),
        })
}

pub struct ResultsLedger {
    dir: PathBuf,
}

impl ResultsLedger {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(CSV_FILE)
    }

    pub fn comparison_path(&self) -> PathBuf {
        self.dir.join(COMPARISON_FILE)
    }

    pub fn best_path(&self) -> PathBuf {
        self.dir.join(BEST_FILE)
    }

    /// Append one row, writing the header first if the file is new.
    pub fn append(&self, row: &VariantSummary) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path   = self.csv_path();
        let is_new = !path.exists();
        let mut f  = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        if is_new {
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created results CSV: '{}'", path.display());
        }
        writeln!(f, "{}", row.csv_row())?;

        tracing::debug!("Logged {} run at fraction {:.4}", row.variant, row.fraction);
        Ok(())
    }

    pub fn write_comparison(&self, rows: &[VariantSummary]) -> Result<()> {
        self.write_json(&self.comparison_path(), rows)
    }

    pub fn write_best(&self, best: &BestVariant) -> Result<()> {
        self.write_json(&self.best_path(), best)
    }

    pub fn read_best(&self) -> Result<BestVariant> {
        let path = self.best_path();
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Have you run 'compare' first?", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        fs::write(path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(acc: f64) -> MetricsRecord {
        MetricsRecord { accuracy: acc, precision: acc, cross_entropy: 1.5 }
    }

    fn row(variant: &str, post: Option<f64>) -> VariantSummary {
        VariantSummary {
            fraction:         0.1,
            variant:          variant.to_string(),
            result:           match post {
                Some(acc) => TrainingResult::trained(&metrics(0.2), &metrics(acc)),
                None => TrainingResult::evaluated(&metrics(0.2)),
            },
            pre:              metrics(0.2),
            post:             post.map(metrics),
            trainable_params: post.map(|_| 10),
            total_params:     post.map(|_| 100),
            model_dir:        post.map(|_| PathBuf::from(format!("out/{variant}"))),
        }
    }

    #[test]
    fn test_select_best_prefers_first_on_tie() {
        let rows = vec![
            row("baseline", None),
            row("full", Some(0.5)),
            row("classifier_only", Some(0.6)),
            row("lora", Some(0.6)),
        ];
        assert_eq!(select_best(&rows).unwrap().variant, "classifier_only");
    }

    #[test]
    fn test_select_best_ignores_untrained_rows() {
        assert!(select_best(&[row("baseline", None)]).is_none());
    }

    #[test]
    fn test_csv_appends_with_single_header() {
        let tmp    = tempfile::tempdir().unwrap();
        let ledger = ResultsLedger::new(tmp.path());

        ledger.append(&row("baseline", None)).unwrap();
        ledger.append(&row("full", Some(0.5))).unwrap();

        let csv   = fs::read_to_string(ledger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("0.1000,baseline,false,0.200000"));
        assert!(lines[1].ends_with(",,,,,"));
        assert!(lines[2].ends_with(",10,100"));
    }

    #[test]
    fn test_best_variant_round_trip() {
        let tmp    = tempfile::tempdir().unwrap();
        let ledger = ResultsLedger::new(tmp.path());
        let best   = BestVariant {
            fraction:  0.01,
            variant:   "lora".into(),
            accuracy:  0.42,
            model_dir: tmp.path().join("fraction_1/lora/exported_model"),
        };
        ledger.write_best(&best).unwrap();
        assert_eq!(ledger.read_best().unwrap(), best);
    }
}
