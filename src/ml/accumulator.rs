// ============================================================
// Layer 5 — Epoch Accumulator
// ============================================================
// Running totals of one epoch, threaded through a fold over
// the batches and reduced once at the end.
//
//   mean log-likelihood = Σ ll        / num_event
//   accuracy            = num_correct / num_pred
//   RMSE                = √(Σ se / num_pred)
//   MAE                 = Σ ae        / num_pred
//
// num_pred excludes the first event of every sequence, which
// has no predecessor to predict it from.

use std::ops::Add;

use crate::error::TrainError;
use crate::infra::metrics::{EpochMetrics, Report};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochAccumulator {
    pub event_ll:    f64,
    pub time_se:     f64,
    pub time_ae:     f64,
    pub num_correct: u64,
    pub num_event:   u64,
    pub num_pred:    u64,
}

impl Add for EpochAccumulator {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            event_ll:    self.event_ll + rhs.event_ll,
            time_se:     self.time_se + rhs.time_se,
            time_ae:     self.time_ae + rhs.time_ae,
            num_correct: self.num_correct + rhs.num_correct,
            num_event:   self.num_event + rhs.num_event,
            num_pred:    self.num_pred + rhs.num_pred,
        }
    }
}

impl EpochAccumulator {
    /// Fails instead of dividing by zero when the epoch saw no
    /// events or no predictable positions.
    pub fn reduce(&self, report: Report) -> Result<EpochMetrics, TrainError> {
        if self.num_event == 0 {
            return Err(TrainError::NoEvents);
        }
        if self.num_pred == 0 {
            return Err(TrainError::NoPredictions);
        }
        let num_pred = self.num_pred as f64;
        let accuracy = self.num_correct as f64 / num_pred;

        let (type_metric, time_metric) = match report {
            Report::AccuracyRmse => (accuracy, (self.time_se / num_pred).sqrt()),
            Report::ErrorRateMae => (1.0 - accuracy, self.time_ae / num_pred),
        };
        Ok(EpochMetrics {
            log_likelihood: self.event_ll / self.num_event as f64,
            type_metric,
            time_metric,
            report,
        })
    }
}
