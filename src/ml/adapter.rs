// ============================================================
// Layer 5: Low-Rank Adapters
// ============================================================
// A linear projection that can carry an optional LoRA branch:
//
//   y = base(x) + (x @ A @ B) * scaling
//
//   A: [d_in, rank]   random init, trainable
//   B: [rank, d_out]  zero init, trainable
//   scaling = alpha / rank
//
// B starts at zero, so wrapping a layer does not change its output
// until training moves B. Adding a branch freezes the base weights;
// only A and B receive gradients.
//
// Without a branch, AdaptedLinear behaves exactly like Linear, so
// one model type serves every fine-tuning strategy and records of
// each variant load back into the matching structure.
//
// Reference: Hu et al. (2021) LoRA: Low-Rank Adaptation of LLMs

use burn::{
    module::Param,
    nn::Linear,
    prelude::*,
    tensor::Distribution,
};

#[derive(Module, Debug)]
pub struct LoraBranch<B: Backend> {
    pub lora_a:  Param<Tensor<B, 2>>,
    pub lora_b:  Param<Tensor<B, 2>>,
    pub scaling: f64,
}

impl<B: Backend> LoraBranch<B> {
    pub fn init(d_in: usize, d_out: usize, rank: usize, scaling: f64, device: &B::Device) -> Self {
        let bound  = 1.0 / (d_in as f64).sqrt();
        let lora_a = Tensor::random([d_in, rank], Distribution::Uniform(-bound, bound), device);
        let lora_b = Tensor::zeros([rank, d_out], device);

        Self {
            lora_a: Param::from_tensor(lora_a),
            lora_b: Param::from_tensor(lora_b),
            scaling,
        }
    }

    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        x.matmul(self.lora_a.val().unsqueeze())
            .matmul(self.lora_b.val().unsqueeze())
            .mul_scalar(self.scaling)
    }
}

#[derive(Module, Debug)]
pub struct AdaptedLinear<B: Backend> {
    pub base: Linear<B>,
    pub lora: Option<LoraBranch<B>>,
}

impl<B: Backend> AdaptedLinear<B> {
    pub fn new(base: Linear<B>) -> Self {
        Self { base, lora: None }
    }

    /// `(d_in, d_out)` of the wrapped projection.
    pub fn dims(&self) -> (usize, usize) {
        let [d_in, d_out] = self.base.weight.val().dims();
        (d_in, d_out)
    }

    /// Freeze the base weights and attach a fresh adapter.
    pub fn with_adapter(self, rank: usize, scaling: f64, device: &B::Device) -> Self {
        let (d_in, d_out) = self.dims();
        Self {
            base: self.base.no_grad(),
            lora: Some(LoraBranch::init(d_in, d_out, rank, scaling, device)),
        }
    }

    /// Parameters in the adapter branch (0 without one).
    pub fn adapter_params(&self) -> usize {
        self.lora.as_ref().map_or(0, |l| l.num_params())
    }

    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match &self.lora {
            Some(lora) => self.base.forward(x.clone()) + lora.forward(x),
            None => self.base.forward(x),
        }
    }
}
