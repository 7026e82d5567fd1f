// ============================================================
// Layer 6 — Metrics and Log Sink
// ============================================================
// Epoch-level metrics plus the append-only log file.
//
// One line per epoch, 5 decimals, comma separated:
//   epoch, log-likelihood, accuracy, rmse
//
// Example:
//   1, -2.41031,  0.41250,  1.93120
//   2, -2.10544,  0.43875,  1.88007
//
// For the exogenous variant the two last columns hold the
// type error rate and the MAE instead.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Which pair of type/time metrics an epoch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Report {
    /// accuracy (higher is better) and RMSE
    AccuracyRmse,
    /// 1 − accuracy (lower is better) and MAE
    ErrorRateMae,
}

impl Report {
    pub fn type_label(self) -> &'static str {
        match self {
            Report::AccuracyRmse => "accuracy",
            Report::ErrorRateMae => "mark error",
        }
    }

    pub fn time_label(self) -> &'static str {
        match self {
            Report::AccuracyRmse => "RMSE",
            Report::ErrorRateMae => "MAE",
        }
    }
}

/// Reduced metrics of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Mean log-likelihood per event
    pub log_likelihood: f64,
    /// Accuracy, or error rate under Report::ErrorRateMae
    pub type_metric: f64,
    /// RMSE, or MAE under Report::ErrorRateMae
    pub time_metric: f64,
    pub report: Report,
}

// ─── Best-so-far tracking ─────────────────────────────────────────────────────
/// Validation metrics of every epoch so far. Display only:
/// nothing stops early or checkpoints on these.
#[derive(Debug, Clone, Default)]
pub struct ValidationHistory {
    log_likelihood: Vec<f64>,
    type_metric:    Vec<f64>,
    time_metric:    Vec<f64>,
    report:         Option<Report>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestSoFar {
    pub log_likelihood: f64,
    pub type_metric:    f64,
    pub time_metric:    f64,
}

impl ValidationHistory {
    pub fn record(&mut self, m: &EpochMetrics) {
        self.log_likelihood.push(m.log_likelihood);
        self.type_metric.push(m.type_metric);
        self.time_metric.push(m.time_metric);
        self.report = Some(m.report);
    }

    pub fn len(&self) -> usize {
        self.log_likelihood.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_likelihood.is_empty()
    }

    /// Max log-likelihood, best type metric (max accuracy or min error
    /// rate) and min time error over the recorded epochs.
    pub fn best(&self) -> Option<BestSoFar> {
        let report = self.report?;
        let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
        Some(BestSoFar {
            log_likelihood: max(&self.log_likelihood),
            type_metric: match report {
                Report::AccuracyRmse => max(&self.type_metric),
                Report::ErrorRateMae => min(&self.type_metric),
            },
            time_metric: min(&self.time_metric),
        })
    }
}

// ─── Log sink ─────────────────────────────────────────────────────────────────
/// Appends one line per epoch to a plain-text log file.
pub struct MetricsLogger {
    path: PathBuf,
}

impl MetricsLogger {
    /// Creates parent directories; an existing file is appended to.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn log(&self, epoch: usize, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open log file '{}'", self.path.display()))?;
        writeln!(f, "{}", format_line(epoch, m))?;

        tracing::debug!("Logged epoch {} to '{}'", epoch, self.path.display());
        Ok(())
    }
}

pub fn format_line(epoch: usize, m: &EpochMetrics) -> String {
    format!(
        "{}, {:8.5}, {:8.5}, {:8.5}",
        epoch, m.log_likelihood, m.type_metric, m.time_metric
    )
}
