use burn::{
    module::Param,
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::PAD;

// ─── Model contract ───────────────────────────────────────────────────────────
/// Output of one forward pass over a padded batch.
#[derive(Debug, Clone)]
pub struct ModelOutput<B: Backend> {
    /// Per-position history representation: [batch, seq_len, d_model]
    pub hidden: Tensor<B, 3>,
    /// Next-type logits: [batch, seq_len, num_types]
    pub type_logits: Tensor<B, 3>,
    /// Next-gap estimate: [batch, seq_len]
    pub time_estimate: Tensor<B, 2>,
}

/// Capability interface of a neural point process. The loss module
/// and epoch drivers depend only on this, so any architecture that
/// satisfies it can be trained.
///
/// Train/eval mode is carried by the backend: a model on an
/// `AutodiffBackend` tracks gradients and applies dropout, and
/// `AutodiffModule::valid()` yields the evaluation-mode copy.
pub trait PointProcess<B: Backend> {
    fn num_types(&self) -> usize;

    /// Sharpness β of the softplus turning pre-activations into intensities.
    fn softplus_beta(&self) -> f64;

    fn forward(&self, event_type: Tensor<B, 2, Int>, event_time: Tensor<B, 2>) -> ModelOutput<B>;

    /// Per-type intensity pre-activations `elapsed` time units after
    /// each history position.
    ///
    /// history: [batch, steps, d_model], anchor_time: [batch, steps],
    /// elapsed: [batch, steps, samples] → [batch, steps, samples, num_types]
    fn intensity_logits(
        &self,
        history:     Tensor<B, 3>,
        anchor_time: Tensor<B, 2>,
        elapsed:     Tensor<B, 3>,
    ) -> Tensor<B, 4>;
}

// ─── Transformer Hawkes Process ───────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TransformerHawkesConfig {
    pub num_types: usize,
    #[config(default = 64)]
    pub d_model: usize,
    #[config(default = 128)]
    pub d_inner: usize,
    #[config(default = 4)]
    pub n_head: usize,
    #[config(default = 4)]
    pub n_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1.0)]
    pub softplus_beta: f64,
}

impl TransformerHawkesConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerHawkes<B> {
        // +1 row so PAD has its own (ignored) embedding
        let event_embedding = EmbeddingConfig::new(self.num_types + 1, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.n_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let type_head      = LinearConfig::new(self.d_model, self.num_types).with_bias(false).init(device);
        let time_head      = LinearConfig::new(self.d_model, 1).with_bias(false).init(device);
        let intensity_head = LinearConfig::new(self.d_model, self.num_types).init(device);
        let alpha   = Param::from_tensor(Tensor::from_floats([-0.1], device));
        let dropout = DropoutConfig::new(self.dropout).init();
        TransformerHawkes {
            event_embedding, layers,
            type_head, time_head, intensity_head,
            alpha, dropout,
            d_model:   self.d_model,
            num_types: self.num_types,
            beta:      self.softplus_beta,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.n_head)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_inner).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_inner, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// mask_pad: [batch, seq_len], true on PAD keys.
    /// mask_attn: [batch, seq_len, seq_len], true above the diagonal.
    pub fn forward(
        &self,
        x:         Tensor<B, 3>,
        mask_pad:  Tensor<B, 2, Bool>,
        mask_attn: Tensor<B, 3, Bool>,
    ) -> Tensor<B, 3> {
        let input = MhaInput::self_attn(x.clone()).mask_pad(mask_pad).mask_attn(mask_attn);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerHawkes<B: Backend> {
    pub event_embedding: Embedding<B>,
    pub layers:          Vec<EncoderBlock<B>>,
    pub type_head:       Linear<B>,
    pub time_head:       Linear<B>,
    pub intensity_head:  Linear<B>,
    /// Weight of the normalised elapsed time inside the intensity
    pub alpha:           Param<Tensor<B, 1>>,
    pub dropout:         Dropout,
    pub d_model:         usize,
    pub num_types:       usize,
    pub beta:            f64,
}

impl<B: Backend> TransformerHawkes<B> {
    /// Sinusoidal encoding of absolute event time:
    ///   enc[.., 2i]   = sin(t / 10000^(2i/d))
    ///   enc[.., 2i+1] = cos(t / 10000^(2i/d))
    /// cos is written as sin shifted by π/2 so one tensor op covers both.
    fn temporal_encoding(&self, event_time: Tensor<B, 2>, non_pad: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = event_time.dims();
        let device = event_time.device();
        let d = self.d_model;

        let (inv_freq, phase): (Vec<f32>, Vec<f32>) = (0..d)
            .map(|i| {
                let exponent = (2 * (i / 2)) as f64 / d as f64;
                let shift = if i % 2 == 0 { 0.0 } else { std::f32::consts::FRAC_PI_2 };
                ((1.0 / 10000f64.powf(exponent)) as f32, shift)
            })
            .unzip();
        let inv_freq = Tensor::<B, 1>::from_floats(inv_freq.as_slice(), &device)
            .reshape([1, 1, d])
            .expand([batch_size, seq_len, d]);
        let phase = Tensor::<B, 1>::from_floats(phase.as_slice(), &device)
            .reshape([1, 1, d])
            .expand([batch_size, seq_len, d]);

        let angle = event_time.unsqueeze_dim::<3>(2).expand([batch_size, seq_len, d]) * inv_freq + phase;
        angle.sin() * non_pad.expand([batch_size, seq_len, d])
    }
}

impl<B: Backend> PointProcess<B> for TransformerHawkes<B> {
    fn num_types(&self) -> usize {
        self.num_types
    }

    fn softplus_beta(&self) -> f64 {
        self.beta
    }

    fn forward(&self, event_type: Tensor<B, 2, Int>, event_time: Tensor<B, 2>) -> ModelOutput<B> {
        let [batch_size, seq_len] = event_type.dims();
        let device = event_type.device();

        let mask_pad  = event_type.clone().equal_elem(PAD as i64);
        let mask_attn = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);
        let non_pad   = mask_pad.clone().bool_not().float().unsqueeze_dim::<3>(2); // [B, L, 1]

        let tem_enc = self.temporal_encoding(event_time, non_pad.clone());
        let mut x = self.dropout.forward(self.event_embedding.forward(event_type));

        // Time is re-injected before every layer, pads are zeroed after it
        for layer in &self.layers {
            x = layer.forward(x + tem_enc.clone(), mask_pad.clone(), mask_attn.clone())
                * non_pad.clone().expand([batch_size, seq_len, self.d_model]);
        }

        let type_logits = self.type_head.forward(x.clone())
            * non_pad.clone().expand([batch_size, seq_len, self.num_types]);
        let time_estimate = (self.time_head.forward(x.clone()) * non_pad)
            .reshape([batch_size, seq_len]);

        ModelOutput { hidden: x, type_logits, time_estimate }
    }

    /// λ_k(t) = softplus(w_kᵀ h_j + α (t − t_j) / (t_j + 1) + b_k, β)
    fn intensity_logits(
        &self,
        history:     Tensor<B, 3>,
        anchor_time: Tensor<B, 2>,
        elapsed:     Tensor<B, 3>,
    ) -> Tensor<B, 4> {
        let [batch_size, steps, samples] = elapsed.dims();
        let shape = [batch_size, steps, samples, self.num_types];

        let base = self.intensity_head.forward(history).unsqueeze_dim::<4>(2); // [B, S, 1, K]
        let scale = anchor_time.add_scalar(1.0).unsqueeze_dim::<3>(2).expand([batch_size, steps, samples]);
        let drift = (elapsed / scale).unsqueeze_dim::<4>(3)
            * self.alpha.val().reshape([1, 1, 1, 1]).expand([batch_size, steps, samples, 1]);

        base.expand(shape) + drift.expand(shape)
    }
}
