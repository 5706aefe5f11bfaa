// ============================================================
// Layer 3: Review Domain Types
// ============================================================
// A review is a piece of free text with a star rating.
// Ratings 1..=5 are stored as zero-based class labels 0..=4,
// which is what the classifier head predicts.
//
// LabeledExample   → what the dataset loader produces
// TokenizedExample → the same example after fixed-length encoding
//
// Both are plain data: no tensors, no file handles.

use serde::{Deserialize, Serialize};

/// Number of rating classes (1 to 5 stars).
pub const NUM_RATING_CLASSES: usize = 5;

/// A review as it comes out of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Raw review text
    pub text: String,

    /// Zero-based rating class, 0 = one star, 4 = five stars
    pub label: i64,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: i64) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// A review after tokenisation.
///
/// `input_ids` and `attention_mask` always have the same length,
/// the configured maximum sequence length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizedExample {
    pub text:           String,
    pub label:          i64,
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl TokenizedExample {
    /// Number of real (non-padding) tokens.
    pub fn token_count(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}
