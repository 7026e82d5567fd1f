// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch drivers and the per-epoch orchestrator.
//
// One loop body serves both loss variants: LossVariant picks
// the masked or unmasked loss terms and the reported metrics.
//
//   train_epoch    — Autodiff backend, Adam step per batch
//   evaluate_epoch — inner backend (model.valid()), no graph,
//                    dropout off, short batches skipped
//   fit            — epochs × (train → validate → log → LR step)
//   run_training   — builds model, optimizer, loaders and runs
//                    fit plus a final test evaluation
//
// Per-batch objective:
//   loss = −Σ(event_ll − non_event_ll) + type_loss + se / 100
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam,
//            Zuo et al. (2020) Transformer Hawkes Process

use std::time::Instant;

use anyhow::{Context, Result};
use burn::{
    backend::Autodiff,
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{EventBatch, EventBatcher},
    dataset::EventDataset,
};
use crate::domain::traits::SplitData;
use crate::error::TrainError;
use crate::infra::{
    metrics::{EpochMetrics, MetricsLogger, Report, ValidationHistory},
    predictions::PredictionDump,
};
use crate::ml::{
    accumulator::EpochAccumulator,
    likelihood::{
        event_mask, log_likelihood_masked, target_mask, time_loss_ae_masked,
        time_loss_masked, type_loss_masked, TypeLoss,
    },
    model::{ModelOutput, PointProcess, TransformerHawkes, TransformerHawkesConfig},
    scheduler::StepLr,
};

/// Divisor of the squared time error in the training objective.
/// Unscaled, the time term dominates the other two.
pub const TIME_LOSS_SCALE: f64 = 100.0;

pub const LR_STEP_SIZE: usize = 10;
pub const LR_GAMMA:     f64 = 0.5;

// ─── Loss variant ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossVariant {
    /// Every real event is a target; reports accuracy and RMSE.
    Standard,
    /// Only endogenous events are targets; reports 1 − accuracy and MAE.
    Exogenous,
}

impl LossVariant {
    pub fn report(self) -> Report {
        match self {
            LossVariant::Standard => Report::AccuracyRmse,
            LossVariant::Exogenous => Report::ErrorRateMae,
        }
    }

    /// The mask the training losses are restricted to, if any.
    fn endo_mask<B: Backend>(
        self,
        batch: &EventBatch<B>,
    ) -> Result<Option<Tensor<B, 2, Bool>>, TrainError> {
        match self {
            LossVariant::Standard => Ok(None),
            LossVariant::Exogenous => batch
                .endo_mask
                .clone()
                .map(Some)
                .ok_or(TrainError::MissingEndoMask),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpochSettings {
    pub variant:         LossVariant,
    pub loss_fn:         TypeLoss,
    pub stochastic_size: usize,
    /// Evaluation skips every batch smaller than this.
    pub batch_size:      usize,
}

// ─── Per-batch terms ──────────────────────────────────────────────────────────
struct BatchTerms<B: Backend> {
    log_likelihood: Tensor<B, 1>,
    type_loss:      Tensor<B, 1>,
    num_correct:    Tensor<B, 1, Int>,
    time_se:        Tensor<B, 1>,
    time_ae:        Tensor<B, 1>,
    num_event:      Tensor<B, 1>,
    num_pred:       Tensor<B, 1>,
}

fn batch_terms<B: Backend, M: PointProcess<B>>(
    model:    &M,
    output:   &ModelOutput<B>,
    batch:    &EventBatch<B>,
    endo:     Option<&Tensor<B, 2, Bool>>,
    settings: &EpochSettings,
) -> BatchTerms<B> {
    let device = batch.event_type.device();

    let (event_ll, non_event_ll) = log_likelihood_masked(
        model,
        output.hidden.clone(),
        batch.event_time.clone(),
        batch.event_type.clone(),
        endo,
        settings.stochastic_size,
    );
    let (type_loss, num_correct) = type_loss_masked(
        output.type_logits.clone(),
        batch.event_type.clone(),
        &settings.loss_fn,
        endo,
    );
    let time_se = time_loss_masked(
        output.time_estimate.clone(),
        batch.event_time.clone(),
        batch.event_type.clone(),
        endo,
    );
    let time_ae = time_loss_ae_masked(
        output.time_estimate.clone(),
        batch.event_time.clone(),
        batch.event_type.clone(),
        endo,
    );

    let num_event = event_mask(&batch.event_type, endo).sum();
    let num_pred = if batch.seq_len() < 2 {
        Tensor::zeros([1], &device)
    } else {
        target_mask(&batch.event_type, endo).sum()
    };

    BatchTerms {
        log_likelihood: (event_ll - non_event_ll).sum(),
        type_loss,
        num_correct,
        time_se,
        time_ae,
        num_event,
        num_pred,
    }
}

impl<B: Backend> BatchTerms<B> {
    fn objective(&self) -> Tensor<B, 1> {
        self.log_likelihood.clone().neg()
            + self.type_loss.clone()
            + self.time_se.clone().div_scalar(TIME_LOSS_SCALE)
    }

    fn into_stats(self) -> EpochAccumulator {
        EpochAccumulator {
            event_ll:    self.log_likelihood.into_scalar().elem::<f64>(),
            time_se:     self.time_se.into_scalar().elem::<f64>(),
            time_ae:     self.time_ae.into_scalar().elem::<f64>(),
            num_correct: self.num_correct.into_scalar().elem::<i64>().max(0) as u64,
            num_event:   self.num_event.into_scalar().elem::<f64>().round() as u64,
            num_pred:    self.num_pred.into_scalar().elem::<f64>().round() as u64,
        }
    }
}

// ─── Training epoch ───────────────────────────────────────────────────────────
/// One pass over `loader`, one optimizer step per batch. Returns the
/// updated model and the epoch's reduced metrics.
pub fn train_epoch<B, M, O>(
    model:    M,
    loader:   &dyn DataLoader<EventBatch<B>>,
    optim:    &mut O,
    lr:       f64,
    settings: &EpochSettings,
) -> Result<(M, EpochMetrics), TrainError>
where
    B: AutodiffBackend,
    M: PointProcess<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let (model, totals) = loader.iter().try_fold(
        (model, EpochAccumulator::default()),
        |(model, totals), batch| {
            let endo   = settings.variant.endo_mask(&batch)?;
            let output = model.forward(batch.event_type.clone(), batch.event_time.clone());
            let terms  = batch_terms(&model, &output, &batch, endo.as_ref(), settings);

            // Burn builds a fresh gradient set per backward pass
            let grads = terms.objective().backward();
            let grads = GradientsParams::from_grads(grads, &model);
            let model = optim.step(lr, model, grads);

            Ok::<_, TrainError>((model, totals + terms.into_stats()))
        },
    )?;

    Ok((model, totals.reduce(settings.variant.report())?))
}

// ─── Evaluation epoch ─────────────────────────────────────────────────────────
/// Shifted per-position predictions and targets, one entry per
/// evaluated batch. Types are 0-indexed; pad targets read −1.
#[derive(Debug, Clone)]
pub struct CollectedPredictions<B: Backend> {
    pub pred_type: Vec<Tensor<B, 3>>,
    pub true_type: Vec<Tensor<B, 2, Int>>,
    pub pred_time: Vec<Tensor<B, 2>>,
    pub true_time: Vec<Tensor<B, 2>>,
}

impl<B: Backend> Default for CollectedPredictions<B> {
    fn default() -> Self {
        Self {
            pred_type: Vec::new(),
            true_type: Vec::new(),
            pred_time: Vec::new(),
            true_time: Vec::new(),
        }
    }
}

impl<B: Backend> CollectedPredictions<B> {
    fn push(&mut self, output: &ModelOutput<B>, batch: &EventBatch<B>) {
        let [batch_size, seq_len, num_types] = output.type_logits.dims();
        if seq_len < 2 {
            return;
        }
        let steps = seq_len - 1;
        let times = batch.event_time.clone();

        self.pred_type.push(output.type_logits.clone().slice([0..batch_size, 0..steps, 0..num_types]));
        self.true_type.push(batch.event_type.clone().slice([0..batch_size, 1..seq_len]).sub_scalar(1));
        self.pred_time.push(output.time_estimate.clone().slice([0..batch_size, 0..steps]));
        self.true_time.push(
            times.clone().slice([0..batch_size, 1..seq_len]) - times.slice([0..batch_size, 0..steps]),
        );
    }

    /// Number of collected batches.
    pub fn len(&self) -> usize {
        self.pred_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pred_type.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation<B: Backend> {
    pub metrics:   EpochMetrics,
    pub collected: CollectedPredictions<B>,
}

/// Gradient-free pass with the unmasked losses. A batch smaller than
/// `settings.batch_size` contributes nothing, neither to the metrics
/// nor to the collected predictions.
pub fn evaluate_epoch<B: Backend, M: PointProcess<B>>(
    model:    &M,
    loader:   &dyn DataLoader<EventBatch<B>>,
    settings: &EpochSettings,
) -> Result<Evaluation<B>, TrainError> {
    let (totals, collected, skipped) = loader.iter().fold(
        (EpochAccumulator::default(), CollectedPredictions::default(), 0usize),
        |(totals, mut collected, skipped), batch| {
            if batch.batch_size() < settings.batch_size {
                return (totals, collected, skipped + 1);
            }
            let output = model.forward(batch.event_type.clone(), batch.event_time.clone());
            let terms  = batch_terms(model, &output, &batch, None, settings);
            collected.push(&output, &batch);
            (totals + terms.into_stats(), collected, skipped)
        },
    );

    if skipped > 0 {
        tracing::debug!("Skipped {} short batch(es) during evaluation", skipped);
    }

    Ok(Evaluation {
        metrics: totals.reduce(settings.variant.report())?,
        collected,
    })
}

// ─── Orchestrator ─────────────────────────────────────────────────────────────
pub struct FitOutcome<M> {
    pub model:   M,
    pub history: ValidationHistory,
}

fn log_phase(phase: &str, m: &EpochMetrics, started: Instant) {
    tracing::info!(
        "  - ({}) log-likelihood: {:8.5}, {}: {:8.5}, {}: {:8.5}, elapse: {:3.3} min",
        phase,
        m.log_likelihood,
        m.report.type_label(),
        m.type_metric,
        m.report.time_label(),
        m.time_metric,
        started.elapsed().as_secs_f64() / 60.0,
    );
}

/// Runs `epochs` epochs. With a validation loader each epoch is
/// validated and the validation metrics go to the sink; without one
/// the training metrics are logged instead. The scheduler steps once
/// per epoch after both phases.
#[allow(clippy::too_many_arguments)]
pub fn fit<B, M, O>(
    mut model:    M,
    train_loader: &dyn DataLoader<EventBatch<B>>,
    valid_loader: Option<&dyn DataLoader<EventBatch<B::InnerBackend>>>,
    optim:        &mut O,
    scheduler:    &mut StepLr,
    settings:     &EpochSettings,
    epochs:       usize,
    sink:         &MetricsLogger,
) -> Result<FitOutcome<M>>
where
    B: AutodiffBackend,
    M: PointProcess<B> + AutodiffModule<B>,
    M::InnerModule: PointProcess<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    let mut history = ValidationHistory::default();

    for epoch in 1..=epochs {
        tracing::info!("[ Epoch {} ]", epoch);

        // ── Training phase ────────────────────────────────────────────────────
        let started = Instant::now();
        let (trained, train) = train_epoch(model, train_loader, optim, scheduler.lr(), settings)
            .with_context(|| format!("training epoch {epoch}"))?;
        model = trained;
        log_phase("Training", &train, started);

        // ── Validation phase ──────────────────────────────────────────────────
        let logged = match valid_loader {
            Some(loader) => {
                let started = Instant::now();
                let valid = evaluate_epoch(&model.valid(), loader, settings)
                    .with_context(|| format!("validating epoch {epoch}"))?;
                log_phase("Testing", &valid.metrics, started);

                history.record(&valid.metrics);
                if let Some(best) = history.best() {
                    tracing::info!(
                        "  - [Info] Maximum ll: {:8.5}, best {}: {:8.5}, best {}: {:8.5}",
                        best.log_likelihood,
                        valid.metrics.report.type_label(),
                        best.type_metric,
                        valid.metrics.report.time_label(),
                        best.time_metric,
                    );
                }
                valid.metrics
            }
            None => train,
        };

        sink.log(epoch, &logged)?;

        let lr = scheduler.step();
        tracing::debug!("Learning rate for next epoch: {:.2e}", lr);
    }

    Ok(FitOutcome { model, history })
}

// ─── Entry point ──────────────────────────────────────────────────────────────
pub struct PreparedSplits {
    pub train: SplitData,
    pub valid: Option<SplitData>,
    pub test:  SplitData,
}

fn eval_loader<B: Backend>(
    device:     &B::Device,
    batch_size: usize,
    split:      SplitData,
) -> std::sync::Arc<dyn DataLoader<EventBatch<B>>> {
    DataLoaderBuilder::new(EventBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(1)
        .build(EventDataset::new(split.sequences))
}

pub fn run_training<B: Backend>(
    cfg:    &TrainConfig,
    splits: PreparedSplits,
    device: B::Device,
) -> Result<()> {
    B::seed(cfg.seed);

    let variant = if cfg.exogenous { LossVariant::Exogenous } else { LossVariant::Standard };
    let settings = EpochSettings {
        variant,
        loss_fn:         TypeLoss::smoothed(cfg.smooth),
        stochastic_size: cfg.stochastic_size,
        batch_size:      cfg.batch_size,
    };

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = TransformerHawkesConfig::new(splits.train.num_types)
        .with_d_model(cfg.d_model)
        .with_d_inner(cfg.d_inner)
        .with_n_head(cfg.n_head)
        .with_n_layers(cfg.n_layers)
        .with_dropout(cfg.dropout);
    let model: TransformerHawkes<Autodiff<B>> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} event types",
        cfg.n_layers, cfg.d_model, splits.train.num_types,
    );

    // ── Adam optimiser + step schedule ────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-5)
        .init::<Autodiff<B>, TransformerHawkes<Autodiff<B>>>();
    let mut scheduler = StepLr::new(cfg.lr, LR_STEP_SIZE, LR_GAMMA);

    // ── Training data loader (Autodiff backend, shuffled) ─────────────────────
    let train_batcher = if cfg.exogenous {
        EventBatcher::<Autodiff<B>>::with_endo_mask(device.clone())
    } else {
        EventBatcher::<Autodiff<B>>::new(device.clone())
    };
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(EventDataset::new(splits.train.sequences));

    // ── Evaluation loaders (inner backend, no autodiff overhead) ──────────────
    let valid_loader = splits
        .valid
        .map(|split| eval_loader::<B>(&device, cfg.batch_size, split));
    let test_loader = eval_loader::<B>(&device, cfg.batch_size, splits.test);

    let sink = MetricsLogger::new(&cfg.log)?;

    let outcome = fit(
        model,
        train_loader.as_ref(),
        valid_loader.as_deref(),
        &mut optim,
        &mut scheduler,
        &settings,
        cfg.epoch,
        &sink,
    )?;

    // ── Final test evaluation ─────────────────────────────────────────────────
    let started = Instant::now();
    let test = evaluate_epoch(&outcome.model.valid(), test_loader.as_ref(), &settings)
        .context("evaluating the test split")?;
    log_phase("Test", &test.metrics, started);

    if let Some(path) = &cfg.predictions {
        PredictionDump::from_collected(&test.collected)?.write(path)?;
        tracing::info!("Wrote {} batch(es) of predictions to {}", test.collected.len(), path);
    }

    tracing::info!("Training complete!");
    Ok(())
}
