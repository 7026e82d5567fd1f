// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Pick the sequence source   (Layer 4 - data)
//   Step 2: Load train / dev / test    (Layer 4 - data)
//   Step 3: Check type counts agree    (Layer 3 - domain)
//   Step 4: Dispatch on the device     (Layer 5 - ml)
//
// Everything from model construction to the final test
// evaluation happens inside ml::trainer::run_training.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::data::{loader::PickleLoader, synthetic::SyntheticSource};
use crate::domain::traits::{SequenceSource, SplitData};
use crate::ml::trainer::{run_training, PreparedSplits};

// ─── Device selection ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    /// NdArray backend
    Cpu,
    /// WGPU backend on the default adapter
    Gpu,
}

impl FromStr for DeviceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "gpu" | "cuda" | "wgpu" => Ok(DeviceKind::Gpu),
            other => bail!("Unknown device '{other}' (expected cpu or gpu)"),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Gpu => write!(f, "gpu"),
        }
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All options of a training run. Serialisable so a run can be
// described in the log alongside its metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Archive path prefix; `None` trains on synthetic sequences
    pub data:            Option<String>,
    pub batch_size:      usize,
    pub epoch:           usize,
    pub device:          DeviceKind,
    pub log:             String,

    pub d_model:         usize,
    pub d_inner:         usize,
    pub n_head:          usize,
    pub n_layers:        usize,
    pub dropout:         f64,

    pub lr:              f64,
    pub smooth:          f64,
    pub stochastic_size: usize,
    pub seed:            u64,

    /// Train with the endogenous-masked losses
    pub exogenous:       bool,
    /// Validate on the dev split every epoch
    pub validate:        bool,
    pub predictions:     Option<String>,

    pub synthetic_types:     usize,
    pub synthetic_sequences: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data:            None,
            batch_size:      16,
            epoch:           30,
            device:          DeviceKind::Cpu,
            log:             "log.txt".to_string(),
            d_model:         64,
            d_inner:         128,
            n_head:          4,
            n_layers:        4,
            dropout:         0.1,
            lr:              1e-4,
            smooth:          0.1,
            stochastic_size: 20,
            seed:            42,
            exogenous:       false,
            validate:        true,
            predictions:     None,
            synthetic_types:     5,
            synthetic_sequences: 200,
        }
    }
}

impl TrainConfig {
    /// The configured source: archives when a prefix is given,
    /// the seeded Poisson generator otherwise.
    pub fn source(&self) -> Box<dyn SequenceSource> {
        match &self.data {
            Some(prefix) => Box::new(PickleLoader::new(prefix.clone())),
            None => Box::new(SyntheticSource::new(
                self.synthetic_types,
                self.synthetic_sequences,
                self.seed,
            )),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        ensure!(cfg.batch_size > 0, "batch size must be positive");
        ensure!(
            cfg.d_model % cfg.n_head == 0,
            "d_model ({}) must be divisible by n_head ({})",
            cfg.d_model,
            cfg.n_head
        );

        // ── Steps 1-2: Load the splits ────────────────────────────────────────
        match &cfg.data {
            Some(prefix) => tracing::info!("Reading archives with prefix '{}'", prefix),
            None => tracing::info!(
                "No --data given: generating {} synthetic sequences per split over {} types",
                cfg.synthetic_sequences,
                cfg.synthetic_types
            ),
        }
        let source = cfg.source();
        let train = source.load_split("train")?;
        let valid = if cfg.validate { Some(source.load_split("dev")?) } else { None };
        let test  = source.load_split("test")?;

        // ── Step 3: Type counts ───────────────────────────────────────────────
        // The model is sized from the training split
        for (name, split) in [("dev", valid.as_ref()), ("test", Some(&test))] {
            if let Some(split) = split {
                check_types(name, split, train.num_types)?;
            }
        }
        tracing::info!(
            "Splits: {} train, {} dev, {} test sequences",
            train.sequences.len(),
            valid.as_ref().map_or(0, |v| v.sequences.len()),
            test.sequences.len()
        );

        let splits = PreparedSplits { train, valid, test };

        // ── Step 4: Run on the selected device ────────────────────────────────
        match cfg.device {
            DeviceKind::Cpu => {
                let device = burn::backend::ndarray::NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                run_training::<burn::backend::NdArray>(cfg, splits, device)
            }
            DeviceKind::Gpu => {
                let device = burn::backend::wgpu::WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_training::<burn::backend::Wgpu>(cfg, splits, device)
            }
        }
    }
}

fn check_types(name: &str, split: &SplitData, train_types: usize) -> Result<()> {
    ensure!(
        split.num_types <= train_types,
        "{name} split declares {} event types but the training split only {}",
        split.num_types,
        train_types
    );
    Ok(())
}
