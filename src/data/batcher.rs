// ============================================================
// Layer 4: Review Batcher
// ============================================================
// Implements Burn's Batcher trait to stack tokenised reviews into
// tensors for one forward pass.
//
//   Input:  Vec of N TokenizedExamples, each S tokens long
//   Output: ReviewBatch with
//             input_ids      [N, S] Int
//             attention_mask [N, S] Int   (1 = token, 0 = padding)
//             labels         [N]    Int
//
// All examples are pre-padded to the same length by the encoder,
// so stacking is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::review::TokenizedExample;

#[derive(Debug, Clone)]
pub struct ReviewBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
    pub labels:         Tensor<B, 1, Int>,
}

#[derive(Clone, Debug, Default)]
pub struct ReviewBatcher;

impl ReviewBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, TokenizedExample, ReviewBatch<B>> for ReviewBatcher {
    fn batch(&self, items: Vec<TokenizedExample>, device: &B::Device) -> ReviewBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |ex| ex.input_ids.len());

        let input_flat: Vec<i64> = items
            .iter()
            .flat_map(|ex| ex.input_ids.iter().map(|&id| id as i64))
            .collect();

        let mask_flat: Vec<i64> = items
            .iter()
            .flat_map(|ex| ex.attention_mask.iter().map(|&m| m as i64))
            .collect();

        let labels: Vec<i64> = items.iter().map(|ex| ex.label).collect();

        ReviewBatch {
            input_ids: Tensor::from_data(
                TensorData::new(input_flat, [batch_size, seq_len]),
                device,
            ),
            attention_mask: Tensor::from_data(
                TensorData::new(mask_flat, [batch_size, seq_len]),
                device,
            ),
            labels: Tensor::from_data(TensorData::new(labels, [batch_size]), device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn example(ids: [u32; 4], label: i64) -> TokenizedExample {
        TokenizedExample {
            text:           String::new(),
            label,
            input_ids:      ids.to_vec(),
            attention_mask: ids.iter().map(|&id| u32::from(id != 0)).collect(),
        }
    }

    #[test]
    fn test_batch_shapes_and_values() {
        let device = Default::default();
        let batch: ReviewBatch<NdArray> = ReviewBatcher::new().batch(
            vec![example([101, 120, 0, 0], 3), example([101, 130, 140, 0], 0)],
            &device,
        );

        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![3, 0]);

        let mask: Vec<i64> = batch.attention_mask.into_data().iter::<i64>().collect();
        assert_eq!(mask, vec![1, 1, 0, 0, 1, 1, 1, 0]);
    }
}
