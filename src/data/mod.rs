// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything from review files on disk to tensor batches:
//
//   train.jsonl / test.jsonl
//       │
//       ▼
//   JsonlReviewLoader → first X% of a split, labels checked
//       │
//       ▼
//   Preprocessor      → unescape, normalise whitespace
//       │
//       ▼
//   ReviewEncoder     → [CLS] + token ids, padded/truncated
//       │
//       ▼
//   ReviewDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   ReviewBatcher     → stacks examples into tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads JSON-lines review splits
pub mod loader;

/// Cleans raw review text
pub mod preprocessor;

/// Fixed-length tokenisation of reviews
pub mod encoder;

/// Prefix selection and seeded holdout splits
pub mod splitter;

/// Implements Burn's Dataset trait for tokenised reviews
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
