// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All Burn model, optimiser and backend code lives here. The
// domain and application layers only see the TrainingEngine
// contract, so the orchestration logic is testable without any
// ML backend.
//
// What's in this layer:
//
//   adapter.rs  : linear projection with an optional LoRA branch
//
//   model.rs    : the transformer encoder review classifier
//                 • Token + positional embeddings
//                 • Masked multi-head self-attention
//                 • Feed-forward networks (GELU activation)
//                 • Layer normalisation + residual connections
//                 • 5-way star rating head on the [CLS] position
//
//   variant.rs  : turns the stock model into the full,
//                 classifier-only or LoRA variant
//
//   engine.rs   : BurnEngine, the TrainingEngine implementation
//                 (minibatch evaluation, one AdamW epoch)
//
// Backend: NdArray (CPU) by default so the harness runs anywhere;
// build with `--features wgpu` to train on the GPU.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

/// Linear projection with an optional low-rank adapter
pub mod adapter;

/// Transformer encoder review classifier
pub mod model;

/// Fine-tuning strategy → prepared model variant
pub mod variant;

/// TrainingEngine backed by Burn
pub mod engine;

#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray;

/// Backend used for training (gradients tracked).
pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;

/// Device of the selected backend.
pub fn default_device() -> <InnerBackend as burn::prelude::Backend>::Device {
    Default::default()
}
