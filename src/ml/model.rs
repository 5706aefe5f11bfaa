use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation, Bool},
};

use crate::domain::strategy::{AdapterConfig, TargetModule};
use crate::ml::adapter::AdaptedLinear;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug, PartialEq)]
pub struct ReviewClassifierConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
    #[config(default = 5)]
    pub num_classes: usize,
}

impl ReviewClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ReviewClassifier<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let head       = LinearConfig::new(self.d_model, self.num_classes).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        ReviewClassifier {
            token_embedding, position_embedding, layers,
            final_norm, head, dropout,
            num_classes: self.num_classes,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let linear = |d_in, d_out| AdaptedLinear::new(LinearConfig::new(d_in, d_out).init(device));
        let attention = SelfAttention {
            query:     linear(self.d_model, self.d_model),
            key:       linear(self.d_model, self.d_model),
            value:     linear(self.d_model, self.d_model),
            output:    linear(self.d_model, self.d_model),
            dropout:   DropoutConfig::new(self.dropout).init(),
            num_heads: self.num_heads,
        };
        EncoderBlock {
            attention,
            ffn_in:  linear(self.d_model, self.d_ff),
            ffn_out: linear(self.d_ff, self.d_model),
            norm1:   LayerNormConfig::new(self.d_model).init(device),
            norm2:   LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Self-attention with adaptable projections ───────────────────────────────
// Written out by hand (instead of nn::attention::MultiHeadAttention) so the
// four projections can carry LoRA branches.
#[derive(Module, Debug)]
pub struct SelfAttention<B: Backend> {
    pub query:     AdaptedLinear<B>,
    pub key:       AdaptedLinear<B>,
    pub value:     AdaptedLinear<B>,
    pub output:    AdaptedLinear<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
}

impl<B: Backend> SelfAttention<B> {
    /// x: [batch, seq, d_model], mask_pad: [batch, seq] (true = padding)
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let [batch_size, seq_len, d_model] = x.dims();
        let d_head = d_model / self.num_heads;

        let heads = |t: Tensor<B, 3>| {
            t.reshape([batch_size, seq_len, self.num_heads, d_head]).swap_dims(1, 2)
        };
        let q = heads(self.query.forward(x.clone()));
        let k = heads(self.key.forward(x.clone()));
        let v = heads(self.value.forward(x));

        // scores: [batch, heads, seq, seq]
        let scores = q.matmul(k.transpose()).div_scalar((d_head as f64).sqrt());
        let mask   = mask_pad
            .reshape([batch_size, 1, 1, seq_len])
            .expand([batch_size, self.num_heads, seq_len, seq_len]);
        let scores  = scores.mask_fill(mask, -1.0e4);
        let weights = self.dropout.forward(activation::softmax(scores, 3));

        let context = weights
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch_size, seq_len, d_model]);
        self.output.forward(context)
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub attention: SelfAttention<B>,
    pub ffn_in:    AdaptedLinear<B>,
    pub ffn_out:   AdaptedLinear<B>,
    pub norm1:     LayerNorm<B>,
    pub norm2:     LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self.attention.forward(x.clone(), mask_pad);
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_out.forward(activation::gelu(self.ffn_in.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }

    fn projection(&self, target: TargetModule) -> &AdaptedLinear<B> {
        match target {
            TargetModule::Query  => &self.attention.query,
            TargetModule::Key    => &self.attention.key,
            TargetModule::Value  => &self.attention.value,
            TargetModule::Output => &self.attention.output,
            TargetModule::FfnIn  => &self.ffn_in,
            TargetModule::FfnOut => &self.ffn_out,
        }
    }

    fn with_adapters(self, adapter: &AdapterConfig, device: &B::Device) -> Self {
        let rank    = adapter.rank;
        let scaling = adapter.scaling();
        let wrap = |layer: AdaptedLinear<B>, target: TargetModule| {
            if adapter.targets(target) {
                layer.with_adapter(rank, scaling, device)
            } else {
                layer
            }
        };

        let SelfAttention { query, key, value, output, dropout, num_heads } = self.attention;
        Self {
            attention: SelfAttention {
                query:  wrap(query, TargetModule::Query),
                key:    wrap(key, TargetModule::Key),
                value:  wrap(value, TargetModule::Value),
                output: wrap(output, TargetModule::Output),
                dropout,
                num_heads,
            },
            ffn_in:  wrap(self.ffn_in, TargetModule::FfnIn),
            ffn_out: wrap(self.ffn_out, TargetModule::FfnOut),
            norm1:   self.norm1,
            norm2:   self.norm2,
            dropout: self.dropout,
        }
    }
}

#[derive(Module, Debug)]
pub struct ReviewClassifier<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub head:               Linear<B>,
    pub dropout:            Dropout,
    pub num_classes:        usize,
}

impl<B: Backend> ReviewClassifier<B> {
    /// input_ids, attention_mask: [batch, seq_len] → logits: [batch, num_classes]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();
        let mask_pad = attention_mask.equal_elem(0);

        let tok_emb = self.token_embedding.forward(input_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]

        // Classify from the [CLS] position.
        let [_, _, d_model] = x.dims();
        let pooled = x.slice([0..batch_size, 0..1, 0..d_model]).reshape([batch_size, d_model]);
        self.head.forward(self.dropout.forward(pooled))
    }

    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input_ids, attention_mask);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }

    /// Freeze everything except the classification head.
    pub fn freeze_backbone(self) -> Self {
        Self {
            token_embedding:    self.token_embedding.no_grad(),
            position_embedding: self.position_embedding.no_grad(),
            layers:             self.layers.into_iter().map(|l| l.no_grad()).collect(),
            final_norm:         self.final_norm.no_grad(),
            head:               self.head,
            dropout:            self.dropout,
            num_classes:        self.num_classes,
        }
    }

    /// Attach LoRA branches to the targeted projections of every layer.
    pub fn with_adapters(self, adapter: &AdapterConfig, device: &B::Device) -> Self {
        Self {
            layers: self
                .layers
                .into_iter()
                .map(|l| l.with_adapters(adapter, device))
                .collect(),
            ..self
        }
    }

    /// Parameters living in LoRA branches.
    pub fn adapter_params(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| TargetModule::ALL.iter().map(move |&t| l.projection(t)))
            .map(AdaptedLinear::adapter_params)
            .sum()
    }

    pub fn head_params(&self) -> usize {
        self.head.num_params()
    }
}
