// ============================================================
// Layer 4: Review Loader
// ============================================================
// Reads a review dataset laid out as JSON-lines files:
//
//   data/reviews/
//     train.jsonl   ← one {"label": 0..4, "text": "..."} per line
//     test.jsonl    ← same format, optional
//
// Label 0 is a one-star review, label 4 a five-star review.
//
// load_split(split, fraction) returns the first `fraction` of the
// file's examples in file order. Only that prefix is parsed, so a
// 1% experiment on a large file stays cheap.
//
// Reference: serde_json documentation (from_str)
//            Rust Book §9 (Error Handling)

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::splitter::fraction_count;
use crate::domain::{
    error::PeftError,
    review::{LabeledExample, NUM_RATING_CLASSES},
    traits::{ReviewSource, Split},
};

pub struct JsonlReviewLoader {
    dir: PathBuf,
}

impl JsonlReviewLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn split_path(&self, split: Split) -> PathBuf {
        self.dir.join(format!("{}.jsonl", split.name()))
    }
}

impl ReviewSource for JsonlReviewLoader {
    fn load_split(&self, split: Split, fraction: f64) -> Result<Vec<LabeledExample>, PeftError> {
        let path = self.split_path(split);
        let raw  = fs::read_to_string(&path).map_err(|e| {
            PeftError::Dataset(format!("cannot read '{}': {e}", path.display()))
        })?;

        let lines: Vec<(usize, &str)> = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();

        let keep = fraction_count(lines.len(), fraction)?;

        let examples = lines[..keep]
            .iter()
            .map(|&(line_no, line)| parse_line(&path, line_no, line))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            "Loaded {} of {} '{}' reviews ({:.1}%)",
            examples.len(),
            lines.len(),
            split.name(),
            fraction * 100.0,
        );
        Ok(examples)
    }

    fn has_split(&self, split: Split) -> bool {
        self.split_path(split).exists()
    }
}

/// Parse one JSON line and check its label is a valid rating class.
fn parse_line(path: &Path, line_no: usize, line: &str) -> Result<LabeledExample, PeftError> {
    let example: LabeledExample = serde_json::from_str(line).map_err(|e| {
        PeftError::Dataset(format!("{}:{}: {e}", path.display(), line_no + 1))
    })?;

    if example.label < 0 || example.label as usize >= NUM_RATING_CLASSES {
        return Err(PeftError::InvalidLabel {
            index:       line_no,
            label:       example.label,
            num_classes: NUM_RATING_CLASSES,
        });
    }
    Ok(example)
}
