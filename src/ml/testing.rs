// Test doubles shared by the ml layer's unit tests.

use burn::prelude::*;

use crate::ml::model::{ModelOutput, PointProcess};

pub type TestBackend = burn::backend::NdArray;
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

/// Closed-form process: every type has intensity pre-activation
/// `logit + slope · elapsed`. With logit above the softplus
/// threshold the intensity is exactly that line, so integrals
/// have a closed form: K · (logit·Δ + slope·Δ²/2).
#[derive(Debug, Clone)]
pub struct LinearRate {
    pub num_types: usize,
    pub logit:     f32,
    pub slope:     f32,
}

impl LinearRate {
    pub fn constant(num_types: usize, logit: f32) -> Self {
        Self { num_types, logit, slope: 0.0 }
    }
}

impl<B: Backend> PointProcess<B> for LinearRate {
    fn num_types(&self) -> usize {
        self.num_types
    }

    fn softplus_beta(&self) -> f64 {
        1.0
    }

    fn forward(&self, event_type: Tensor<B, 2, Int>, _event_time: Tensor<B, 2>) -> ModelOutput<B> {
        let [batch_size, seq_len] = event_type.dims();
        let device = event_type.device();
        ModelOutput {
            hidden:        Tensor::zeros([batch_size, seq_len, 1], &device),
            type_logits:   Tensor::zeros([batch_size, seq_len, self.num_types], &device),
            time_estimate: Tensor::zeros([batch_size, seq_len], &device),
        }
    }

    fn intensity_logits(
        &self,
        _history:     Tensor<B, 3>,
        _anchor_time: Tensor<B, 2>,
        elapsed:      Tensor<B, 3>,
    ) -> Tensor<B, 4> {
        let [batch_size, steps, samples] = elapsed.dims();
        elapsed
            .mul_scalar(self.slope)
            .add_scalar(self.logit)
            .unsqueeze_dim::<4>(3)
            .expand([batch_size, steps, samples, self.num_types])
    }
}

pub fn to_vec<B: Backend, const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
    t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
}

pub fn assert_close(actual: f32, expected: f32, tol: f32) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tolerance {tol})"
    );
}
