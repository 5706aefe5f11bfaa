// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the storage directory:
//
//   checkpoint.rs      : ModelStore, exports a variant's weights
//                        plus variant.json and rebuilds it later
//                        from that directory alone
//
//   tokenizer_store.rs : loads tokenizer.json or builds a
//                        deterministic word-level one from the
//                        training reviews
//
//   ledger.rs          : results.csv, comparison.json and
//                        best_variant.json
//
// Layout of a storage directory after `compare`:
//
//   storage/
//     experiment.json
//     tokenizer.json
//     results.csv
//     comparison.json
//     best_variant.json
//     base_model/
//     fraction_1/
//       full/exported_model/
//       classifier_only/exported_model/
//       lora/exported_model/
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Variant export and reload
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Comparison report files
pub mod ledger;
