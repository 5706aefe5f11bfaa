use burn::data::dataset::Dataset;

use crate::domain::review::TokenizedExample;

/// Tokenised reviews exposed through Burn's Dataset trait.
pub struct ReviewDataset {
    examples: Vec<TokenizedExample>,
}

impl ReviewDataset {
    pub fn new(examples: Vec<TokenizedExample>) -> Self {
        Self { examples }
    }
}

impl Dataset<TokenizedExample> for ReviewDataset {
    fn get(&self, index: usize) -> Option<TokenizedExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}
