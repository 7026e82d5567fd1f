// ============================================================
// Layer 5 — Log-Likelihood and Prediction Losses
// ============================================================
// Pure functions over one padded batch. Every term follows the
// same shift-by-one convention: the history up to position j
// predicts the event at position j+1, so the first event of a
// sequence is never a target and all "target" tensors cover
// positions 1..L.
//
// Masking:
//   target mask = event_type[:, 1:] != PAD
//   masked ("exo") variants additionally multiply it by
//   endo_mask[:, 1:]. With an all-true endo mask the two
//   variants are the same computation times 1.0.
//
// Log-likelihood of a marked TPP over one sequence:
//   ll = Σ_j log λ_{k_{j+1}}(t_{j+1})  −  Σ_j ∫_{t_j}^{t_{j+1}} Σ_k λ_k(s) ds
//        └──────── event_ll ────────┘    └────────── non_event_ll ─────────┘
//
// The integral is estimated by Monte-Carlo: draw u ~ U(0,1)
// per sample, evaluate the total intensity at t_j + u·Δ_j,
// average, multiply by Δ_j. E[estimate] equals the integral.
//
// Reference: Zuo et al. (2020) Transformer Hawkes Process, §3

use burn::{
    prelude::*,
    tensor::{activation::log_softmax, Distribution},
};

use crate::domain::PAD;
use crate::ml::model::PointProcess;

/// Above β·x this value softplus(x) is taken as x.
pub const SOFTPLUS_THRESHOLD: f64 = 20.0;

// ─── Stable activations ───────────────────────────────────────────────────────
/// softplus(x, β) = ln(1 + e^{βx}) / β, linear above the threshold.
/// exp() only ever sees clamped inputs, so it cannot overflow.
pub fn softplus<B: Backend, const D: usize>(x: Tensor<B, D>, beta: f64) -> Tensor<B, D> {
    let scaled = x.clone().mul_scalar(beta);
    let linear = scaled.clone().greater_elem(SOFTPLUS_THRESHOLD);
    let smooth = scaled.clamp_max(SOFTPLUS_THRESHOLD).exp().log1p().div_scalar(beta);
    smooth.mask_where(linear, x)
}

/// ln(softplus(x, β)) without forming tiny or huge intermediates:
///   βx >  T : ln(x)
///   βx < −T : βx − ln β            (softplus ≈ e^{βx} / β)
///   else    : ln(ln(1 + e^{βx}) / β)
pub fn log_softplus<B: Backend, const D: usize>(x: Tensor<B, D>, beta: f64) -> Tensor<B, D> {
    let scaled = x.clone().mul_scalar(beta);
    let upper = scaled.clone().greater_elem(SOFTPLUS_THRESHOLD);
    let lower = scaled.clone().lower_elem(-SOFTPLUS_THRESHOLD);

    let middle = scaled
        .clone()
        .clamp(-SOFTPLUS_THRESHOLD, SOFTPLUS_THRESHOLD)
        .exp()
        .log1p()
        .div_scalar(beta)
        .log();
    let linear = x.clamp_min(SOFTPLUS_THRESHOLD / beta).log();
    let tail = scaled.sub_scalar(beta.ln());

    middle.mask_where(upper, linear).mask_where(lower, tail)
}

// ─── Masks ────────────────────────────────────────────────────────────────────
/// [batch, seq_len − 1] float mask of the shifted target positions
/// that hold a real (and, if given, endogenous) event.
pub fn target_mask<B: Backend>(
    event_type: &Tensor<B, 2, Int>,
    endo_mask:  Option<&Tensor<B, 2, Bool>>,
) -> Tensor<B, 2> {
    let [batch_size, seq_len] = event_type.dims();
    let real = event_type
        .clone()
        .slice([0..batch_size, 1..seq_len])
        .not_equal_elem(PAD as i64)
        .float();
    match endo_mask {
        Some(endo) => real * endo.clone().slice([0..batch_size, 1..seq_len]).float(),
        None => real,
    }
}

/// [batch, seq_len] float mask of real (and, if given, endogenous) events.
pub fn event_mask<B: Backend>(
    event_type: &Tensor<B, 2, Int>,
    endo_mask:  Option<&Tensor<B, 2, Bool>>,
) -> Tensor<B, 2> {
    let real = event_type.clone().not_equal_elem(PAD as i64).float();
    match endo_mask {
        Some(endo) => real * endo.clone().float(),
        None => real,
    }
}

/// 0-indexed class of the event at positions 1..L (PAD clamped to 0;
/// those positions are always masked out).
fn shifted_classes<B: Backend>(event_type: &Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
    let [batch_size, seq_len] = event_type.dims();
    event_type
        .clone()
        .slice([0..batch_size, 1..seq_len])
        .sub_scalar(1)
        .clamp_min(0)
}

// ─── 1. Event log-likelihood ──────────────────────────────────────────────────
/// Returns (event_ll, non_event_ll), one value per sequence: [batch].
/// `stochastic_size` uniform points are drawn per interval.
pub fn log_likelihood<B: Backend, M: PointProcess<B>>(
    model:           &M,
    hidden:          Tensor<B, 3>,
    event_time:      Tensor<B, 2>,
    event_type:      Tensor<B, 2, Int>,
    stochastic_size: usize,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    log_likelihood_masked(model, hidden, event_time, event_type, None, stochastic_size)
}

/// Same as [`log_likelihood`], restricted to endogenous targets.
pub fn log_likelihood_exo<B: Backend, M: PointProcess<B>>(
    model:           &M,
    hidden:          Tensor<B, 3>,
    event_time:      Tensor<B, 2>,
    event_type:      Tensor<B, 2, Int>,
    endo_mask:       Tensor<B, 2, Bool>,
    stochastic_size: usize,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    log_likelihood_masked(model, hidden, event_time, event_type, Some(&endo_mask), stochastic_size)
}

pub fn log_likelihood_masked<B: Backend, M: PointProcess<B>>(
    model:           &M,
    hidden:          Tensor<B, 3>,
    event_time:      Tensor<B, 2>,
    event_type:      Tensor<B, 2, Int>,
    endo_mask:       Option<&Tensor<B, 2, Bool>>,
    stochastic_size: usize,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    let [batch_size, seq_len] = event_type.dims();
    let device = event_type.device();
    if seq_len < 2 {
        return (Tensor::zeros([batch_size], &device), Tensor::zeros([batch_size], &device));
    }
    let draws = Tensor::random(
        [batch_size, seq_len - 1, stochastic_size.max(1)],
        Distribution::Uniform(0.0, 1.0),
        &device,
    );
    likelihood_with_draws(model, hidden, event_time, event_type, endo_mask, draws)
}

/// Likelihood terms with caller-supplied uniform draws,
/// [batch, seq_len − 1, samples], values in [0, 1).
pub fn likelihood_with_draws<B: Backend, M: PointProcess<B>>(
    model:      &M,
    hidden:     Tensor<B, 3>,
    event_time: Tensor<B, 2>,
    event_type: Tensor<B, 2, Int>,
    endo_mask:  Option<&Tensor<B, 2, Bool>>,
    draws:      Tensor<B, 3>,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    let [batch_size, seq_len, d_model] = hidden.dims();
    let device = hidden.device();
    if seq_len < 2 {
        return (Tensor::zeros([batch_size], &device), Tensor::zeros([batch_size], &device));
    }
    let steps     = seq_len - 1;
    let samples   = draws.dims()[2];
    let num_types = model.num_types();
    let beta      = model.softplus_beta();

    let mask    = target_mask(&event_type, endo_mask);
    let history = hidden.slice([0..batch_size, 0..steps, 0..d_model]);
    let anchor  = event_time.clone().slice([0..batch_size, 0..steps]);
    // Zero on masked intervals, so they vanish from the integral
    let gap = (event_time.slice([0..batch_size, 1..seq_len]) - anchor.clone()) * mask.clone();

    // ── Event term: log-intensity of the observed type at t_{j+1} ────────────
    let at_event = model
        .intensity_logits(history.clone(), anchor.clone(), gap.clone().unsqueeze_dim::<3>(2))
        .reshape([batch_size, steps, num_types]);
    let observed = at_event
        .gather(2, shifted_classes(&event_type).unsqueeze_dim::<3>(2))
        .reshape([batch_size, steps]);
    let event_ll = (log_softplus(observed, beta) * mask)
        .sum_dim(1)
        .reshape([batch_size]);

    // ── Non-event term: Monte-Carlo integral of the total intensity ──────────
    let elapsed = gap.clone().unsqueeze_dim::<3>(2).expand([batch_size, steps, samples]) * draws;
    let total_intensity = softplus(model.intensity_logits(history, anchor, elapsed), beta)
        .sum_dim(3)
        .reshape([batch_size, steps, samples])
        .mean_dim(2)
        .reshape([batch_size, steps]);
    let non_event_ll = (total_intensity * gap).sum_dim(1).reshape([batch_size]);

    (event_ll, non_event_ll)
}

// ─── 2. Type prediction loss ──────────────────────────────────────────────────
/// Cross entropy over event types with optional label smoothing.
/// With smoothing ε over K classes the target gets weight 1 − ε and
/// every other class ε / K.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeLoss {
    pub smoothing: f64,
}

impl TypeLoss {
    pub fn cross_entropy() -> Self {
        Self { smoothing: 0.0 }
    }

    pub fn smoothed(smoothing: f64) -> Self {
        Self { smoothing }
    }

    /// logits: [batch, steps, K], target: [batch, steps] 0-indexed
    /// → per-position loss [batch, steps], unreduced.
    pub fn forward<B: Backend>(&self, logits: Tensor<B, 3>, target: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, steps, num_types] = logits.dims();
        let log_prob = log_softmax(logits, 2);
        let nll = log_prob
            .clone()
            .gather(2, target.unsqueeze_dim::<3>(2))
            .reshape([batch_size, steps])
            .neg();
        if self.smoothing == 0.0 {
            return nll;
        }
        let eps = self.smoothing;
        let off_weight = eps / num_types as f64;
        let all = log_prob.sum_dim(2).reshape([batch_size, steps]).neg();
        // Σ_{k≠target} −log p_k = all − nll
        nll.mul_scalar(1.0 - eps - off_weight) + all.mul_scalar(off_weight)
    }
}

/// Returns (summed loss [1], number of correct predictions [1]).
pub fn type_loss<B: Backend>(
    type_logits: Tensor<B, 3>,
    event_type:  Tensor<B, 2, Int>,
    loss_fn:     &TypeLoss,
) -> (Tensor<B, 1>, Tensor<B, 1, Int>) {
    type_loss_masked(type_logits, event_type, loss_fn, None)
}

pub fn type_loss_exo<B: Backend>(
    type_logits: Tensor<B, 3>,
    event_type:  Tensor<B, 2, Int>,
    loss_fn:     &TypeLoss,
    endo_mask:   Tensor<B, 2, Bool>,
) -> (Tensor<B, 1>, Tensor<B, 1, Int>) {
    type_loss_masked(type_logits, event_type, loss_fn, Some(&endo_mask))
}

pub fn type_loss_masked<B: Backend>(
    type_logits: Tensor<B, 3>,
    event_type:  Tensor<B, 2, Int>,
    loss_fn:     &TypeLoss,
    endo_mask:   Option<&Tensor<B, 2, Bool>>,
) -> (Tensor<B, 1>, Tensor<B, 1, Int>) {
    let [batch_size, seq_len, num_types] = type_logits.dims();
    let device = type_logits.device();
    if seq_len < 2 {
        return (Tensor::zeros([1], &device), Tensor::zeros([1], &device));
    }
    let steps  = seq_len - 1;
    let mask   = target_mask(&event_type, endo_mask);
    let target = shifted_classes(&event_type);
    let logits = type_logits.slice([0..batch_size, 0..steps, 0..num_types]);

    let loss = (loss_fn.forward(logits.clone(), target.clone()) * mask.clone()).sum();

    let predicted = logits.argmax(2).reshape([batch_size, steps]);
    let correct = (predicted.equal(target).float() * mask).sum().int();

    (loss, correct)
}

// ─── 3. Time prediction: squared error ────────────────────────────────────────
/// (predicted gap at j − (t_{j+1} − t_j)) on counted positions: [batch, steps]
fn gap_error<B: Backend>(
    time_estimate: Tensor<B, 2>,
    event_time:    Tensor<B, 2>,
    event_type:    &Tensor<B, 2, Int>,
    endo_mask:     Option<&Tensor<B, 2, Bool>>,
) -> Tensor<B, 2> {
    let [batch_size, seq_len] = event_time.dims();
    let steps = seq_len - 1;
    let actual = event_time.clone().slice([0..batch_size, 1..seq_len])
        - event_time.slice([0..batch_size, 0..steps]);
    let predicted = time_estimate.slice([0..batch_size, 0..steps]);
    (predicted - actual) * target_mask(event_type, endo_mask)
}

/// Summed squared gap error [1].
pub fn time_loss<B: Backend>(
    time_estimate: Tensor<B, 2>,
    event_time:    Tensor<B, 2>,
    event_type:    Tensor<B, 2, Int>,
) -> Tensor<B, 1> {
    time_loss_masked(time_estimate, event_time, event_type, None)
}

pub fn time_loss_exo<B: Backend>(
    time_estimate: Tensor<B, 2>,
    event_time:    Tensor<B, 2>,
    event_type:    Tensor<B, 2, Int>,
    endo_mask:     Tensor<B, 2, Bool>,
) -> Tensor<B, 1> {
    time_loss_masked(time_estimate, event_time, event_type, Some(&endo_mask))
}

pub fn time_loss_masked<B: Backend>(
    time_estimate: Tensor<B, 2>,
    event_time:    Tensor<B, 2>,
    event_type:    Tensor<B, 2, Int>,
    endo_mask:     Option<&Tensor<B, 2, Bool>>,
) -> Tensor<B, 1> {
    if event_time.dims()[1] < 2 {
        return Tensor::zeros([1], &event_time.device());
    }
    let diff = gap_error(time_estimate, event_time, &event_type, endo_mask);
    (diff.clone() * diff).sum()
}

// ─── 4. Time prediction: absolute error (reporting only) ──────────────────────
pub fn time_loss_ae<B: Backend>(
    time_estimate: Tensor<B, 2>,
    event_time:    Tensor<B, 2>,
    event_type:    Tensor<B, 2, Int>,
) -> Tensor<B, 1> {
    time_loss_ae_masked(time_estimate, event_time, event_type, None)
}

pub fn time_loss_ae_masked<B: Backend>(
    time_estimate: Tensor<B, 2>,
    event_time:    Tensor<B, 2>,
    event_type:    Tensor<B, 2, Int>,
    endo_mask:     Option<&Tensor<B, 2, Bool>>,
) -> Tensor<B, 1> {
    if event_time.dims()[1] < 2 {
        return Tensor::zeros([1], &event_time.device());
    }
    gap_error(time_estimate, event_time, &event_type, endo_mask).abs().sum()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::{assert_close, to_vec, LinearRate, TestBackend};

    fn types(rows: [[i64; 3]; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_ints(rows, &Default::default())
    }

    fn times(rows: [[f32; 3]; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_floats(rows, &Default::default())
    }

    fn hidden(batch_size: usize, seq_len: usize) -> Tensor<TestBackend, 3> {
        Tensor::zeros([batch_size, seq_len, 1], &Default::default())
    }

    fn draws(batch_size: usize, steps: usize, samples: usize, value: f32) -> Tensor<TestBackend, 3> {
        Tensor::<TestBackend, 3>::ones([batch_size, steps, samples], &Default::default()).mul_scalar(value)
    }

    // ── Stable activations ───────────────────────────────────────────────────

    #[test]
    fn test_softplus_matches_closed_form() {
        let x = Tensor::<TestBackend, 1>::from_floats([-2.0, 0.0, 3.0], &Default::default());
        let out = to_vec(softplus(x, 1.0));
        for (got, xv) in out.iter().zip([-2.0f32, 0.0, 3.0]) {
            assert_close(*got, (1.0 + xv.exp()).ln(), 1e-5);
        }
    }

    #[test]
    fn test_softplus_large_input_is_linear_and_finite() {
        let x = Tensor::<TestBackend, 1>::from_floats([25.0, 1.0e4, 1.0e30], &Default::default());
        let out = to_vec(softplus(x, 1.0));
        assert_eq!(out, vec![25.0, 1.0e4, 1.0e30]);
    }

    #[test]
    fn test_log_softplus_is_finite_everywhere() {
        let x = Tensor::<TestBackend, 1>::from_floats([-1.0e4, -50.0, 0.0, 50.0, 1.0e4], &Default::default());
        let out = to_vec(log_softplus(x, 1.0));
        assert!(out.iter().all(|v| v.is_finite()));
        assert_close(out[0], -1.0e4, 1e-1);
        assert_close(out[1], -50.0, 1e-4);
        assert_close(out[2], 2f32.ln().ln(), 1e-5);
        assert_close(out[3], 50f32.ln(), 1e-5);
    }

    // ── Log-likelihood ───────────────────────────────────────────────────────

    #[test]
    fn test_constant_intensity_terms_are_exact() {
        // λ_k = 30 for both types → total 60 over gaps 1 and 2
        let model = LinearRate::constant(2, 30.0);
        let (event_ll, non_event_ll) = log_likelihood::<TestBackend, _>(
            &model,
            hidden(2, 3),
            times([[0.0, 1.0, 3.0], [0.0, 0.0, 0.0]]),
            types([[1, 2, 1], [0, 0, 0]]),
            20,
        );
        let event_ll = to_vec(event_ll);
        let non_event_ll = to_vec(non_event_ll);

        assert_close(event_ll[0], 2.0 * 30f32.ln(), 1e-4);
        assert_close(non_event_ll[0], 180.0, 1e-3);
        // All-pad sequence: zero, never NaN
        assert_eq!(event_ll[1], 0.0);
        assert_eq!(non_event_ll[1], 0.0);
    }

    #[test]
    fn test_single_event_sequence_contributes_nothing() {
        let model = LinearRate::constant(3, 30.0);
        let (event_ll, non_event_ll) = log_likelihood::<TestBackend, _>(
            &model,
            hidden(2, 3),
            times([[4.0, 0.0, 0.0], [0.0, 1.0, 2.0]]),
            types([[2, 0, 0], [1, 1, 1]]),
            10,
        );
        assert_eq!(to_vec(event_ll)[0], 0.0);
        assert_eq!(to_vec(non_event_ll)[0], 0.0);
    }

    #[test]
    fn test_single_column_batch_is_zero() {
        let device = Default::default();
        let model = LinearRate::constant(2, 30.0);
        let (event_ll, non_event_ll) = log_likelihood::<TestBackend, _>(
            &model,
            Tensor::zeros([2, 1, 1], &device),
            Tensor::from_floats([[1.0], [2.0]], &device),
            Tensor::from_ints([[1], [2]], &device),
            10,
        );
        assert_eq!(to_vec(event_ll), vec![0.0, 0.0]);
        assert_eq!(to_vec(non_event_ll), vec![0.0, 0.0]);
    }

    #[test]
    fn test_midpoint_draws_integrate_linear_intensity_exactly() {
        // λ_k(s) = 30 + 2s, K = 2, gaps 1 and 2:
        // 2·(30·1 + 1²) + 2·(30·2 + 2²) = 62 + 128 = 190
        let model = LinearRate { num_types: 2, logit: 30.0, slope: 2.0 };
        let (_, non_event_ll) = likelihood_with_draws::<TestBackend, _>(
            &model,
            hidden(2, 3),
            times([[0.0, 1.0, 3.0], [0.0, 1.0, 3.0]]),
            types([[1, 1, 1], [1, 1, 1]]),
            None,
            draws(2, 2, 4, 0.5),
        );
        for v in to_vec(non_event_ll) {
            assert_close(v, 190.0, 1e-3);
        }
    }

    #[test]
    fn test_monte_carlo_integral_is_unbiased() {
        TestBackend::seed(17);
        let model = LinearRate { num_types: 2, logit: 30.0, slope: 2.0 };
        let (_, non_event_ll) = log_likelihood::<TestBackend, _>(
            &model,
            hidden(2, 3),
            times([[0.0, 1.0, 3.0], [0.0, 1.0, 3.0]]),
            types([[1, 2, 2], [2, 1, 1]]),
            4000,
        );
        let mean = to_vec(non_event_ll).iter().sum::<f32>() / 2.0;
        assert_close(mean, 190.0, 1.0);
    }

    #[test]
    fn test_all_true_mask_matches_unmasked_likelihood() {
        let model = LinearRate { num_types: 3, logit: 1.5, slope: 0.7 };
        let et = times([[0.0, 0.5, 2.0], [0.0, 1.0, 0.0]]);
        let ty = types([[1, 3, 2], [2, 1, 0]]);
        let mask = Tensor::<TestBackend, 2, Int>::ones([2, 3], &Default::default()).greater_elem(0);
        let u = Tensor::<TestBackend, 3>::random([2, 2, 8], Distribution::Uniform(0.0, 1.0), &Default::default());

        let (ev, non) = likelihood_with_draws(&model, hidden(2, 3), et.clone(), ty.clone(), None, u.clone());
        let (ev_exo, non_exo) = likelihood_with_draws(&model, hidden(2, 3), et, ty, Some(&mask), u);
        assert_eq!(to_vec(ev), to_vec(ev_exo));
        assert_eq!(to_vec(non), to_vec(non_exo));
    }

    #[test]
    fn test_exogenous_positions_are_excluded() {
        let model = LinearRate::constant(1, 30.0);
        let endo = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 0], [1, 1, 1]], &Default::default())
            .greater_elem(0);
        let (event_ll, non_event_ll) = log_likelihood_exo(
            &model,
            hidden(2, 3),
            times([[0.0, 1.0, 3.0], [0.0, 1.0, 3.0]]),
            types([[1, 1, 1], [1, 1, 1]]),
            endo,
            5,
        );
        let ev = to_vec(event_ll);
        let non = to_vec(non_event_ll);
        // Row 0 keeps only the first interval
        assert_close(ev[0], 30f32.ln(), 1e-4);
        assert_close(non[0], 30.0, 1e-3);
        assert_close(ev[1], 2.0 * 30f32.ln(), 1e-4);
        assert_close(non[1], 90.0, 1e-3);
    }

    // ── Counting ─────────────────────────────────────────────────────────────

    #[test]
    fn test_prediction_count_excludes_first_events_and_pads() {
        // Lengths [2, 3] padded to 3 → (2−1) + (3−1) = 3
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let count = to_vec(target_mask(&ty, None).sum())[0];
        assert_eq!(count, 3.0);
        assert_eq!(to_vec(event_mask(&ty, None).sum())[0], 5.0);
    }

    // ── Type loss ────────────────────────────────────────────────────────────

    #[test]
    fn test_type_loss_perfect_logits() {
        // Logits at position j point at the type of j+1
        let device = Default::default();
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let logits = Tensor::<TestBackend, 3>::from_floats(
            [
                [[0.0, 50.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
                [[0.0, 0.0, 50.0], [50.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            ],
            &device,
        );
        let (loss, correct) = type_loss(logits, ty, &TypeLoss::cross_entropy());
        assert_eq!(correct.into_scalar(), 3);
        assert_close(to_vec(loss)[0], 0.0, 1e-4);
    }

    #[test]
    fn test_type_loss_counts_never_exceed_predictions() {
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let logits = Tensor::<TestBackend, 3>::random([2, 3, 3], Distribution::Default, &Default::default());
        let (loss, correct) = type_loss(logits, ty, &TypeLoss::cross_entropy());
        assert!(correct.into_scalar() <= 3);
        assert!(to_vec(loss)[0] >= 0.0);
    }

    #[test]
    fn test_uniform_logits_give_log_k_per_prediction() {
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let logits = Tensor::<TestBackend, 3>::zeros([2, 3, 3], &Default::default());
        let (loss, _) = type_loss(logits, ty, &TypeLoss::cross_entropy());
        assert_close(to_vec(loss)[0], 3.0 * 3f32.ln(), 1e-4);
    }

    #[test]
    fn test_label_smoothing_weights() {
        // Uniform logits: Σ weights = 1 − ε/K, so loss = (1 − ε/K)·ln K per position
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let logits = Tensor::<TestBackend, 3>::zeros([2, 3, 3], &Default::default());
        let (loss, _) = type_loss(logits, ty, &TypeLoss::smoothed(0.3));
        assert_close(to_vec(loss)[0], 3.0 * (1.0 - 0.1) * 3f32.ln(), 1e-4);
    }

    #[test]
    fn test_masked_type_loss_restricts_counts() {
        let device = Default::default();
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let logits = Tensor::<TestBackend, 3>::from_floats(
            [
                [[0.0, 50.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
                [[0.0, 0.0, 50.0], [50.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            ],
            &device,
        );
        let all = Tensor::<TestBackend, 2, Int>::ones([2, 3], &device).greater_elem(0);
        let some = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1], [1, 0, 1]], &device).greater_elem(0);

        let (loss_all, correct_all) = type_loss_exo(logits.clone(), ty.clone(), &TypeLoss::cross_entropy(), all);
        let (loss_std, correct_std) = type_loss(logits.clone(), ty.clone(), &TypeLoss::cross_entropy());
        assert_eq!(to_vec(loss_all), to_vec(loss_std));
        assert_eq!(correct_all.into_scalar(), correct_std.into_scalar());

        let (_, correct_some) = type_loss_exo(logits, ty, &TypeLoss::cross_entropy(), some);
        assert_eq!(correct_some.into_scalar(), 2);
    }

    // ── Time loss ────────────────────────────────────────────────────────────

    #[test]
    fn test_time_loss_zero_for_exact_gaps() {
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let et = times([[0.0, 1.0, 0.0], [0.0, 2.0, 5.0]]);
        // Gap predictions for positions 0..1; the pad transition is ignored
        let est = times([[1.0, 99.0, 0.0], [2.0, 3.0, 7.0]]);
        assert_eq!(to_vec(time_loss(est.clone(), et.clone(), ty.clone()))[0], 0.0);
        assert_eq!(to_vec(time_loss_ae(est, et, ty))[0], 0.0);
    }

    #[test]
    fn test_time_loss_squared_and_absolute() {
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let et = times([[0.0, 1.0, 0.0], [0.0, 2.0, 5.0]]);
        let est = times([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        // errors: 1, 2, 3
        assert_close(to_vec(time_loss(est.clone(), et.clone(), ty.clone()))[0], 14.0, 1e-5);
        assert_close(to_vec(time_loss_ae(est, et, ty))[0], 6.0, 1e-5);
    }

    #[test]
    fn test_time_loss_is_non_negative() {
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let et = times([[0.0, 1.0, 0.0], [0.0, 2.0, 5.0]]);
        let est = Tensor::<TestBackend, 2>::random([2, 3], Distribution::Normal(0.0, 5.0), &Default::default());
        assert!(to_vec(time_loss(est, et, ty))[0] >= 0.0);
    }

    #[test]
    fn test_all_true_mask_matches_unmasked_time_loss() {
        let ty = types([[1, 2, 0], [1, 3, 1]]);
        let et = times([[0.0, 1.0, 0.0], [0.0, 2.0, 5.0]]);
        let est = times([[0.3, 0.1, 0.0], [1.2, 0.4, 2.0]]);
        let all = Tensor::<TestBackend, 2, Int>::ones([2, 3], &Default::default()).greater_elem(0);
        assert_eq!(
            to_vec(time_loss(est.clone(), et.clone(), ty.clone())),
            to_vec(time_loss_exo(est, et, ty, all)),
        );
    }
}
