// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `stats`
// and all their configurable flags.
//
// clap's derive macros generate help text, error messages
// and string → number conversion.

use clap::{Args, Subcommand};

use crate::application::train_use_case::{DeviceKind, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a Transformer Hawkes Process and evaluate it on the test split
    Train(TrainArgs),

    /// Summarise one split of a dataset
    Stats(StatsArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Archive path prefix: reads <data>train.pkl, <data>dev.pkl, <data>test.pkl.
    /// Omit to train on synthetic Poisson sequences.
    #[arg(long)]
    pub data: Option<String>,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Number of epochs
    #[arg(long, default_value_t = 30)]
    pub epoch: usize,

    /// Compute target: cpu or gpu
    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    /// Per-epoch metrics file (appended to)
    #[arg(long, default_value = "log.txt")]
    pub log: String,

    #[arg(long, default_value_t = 64)]
    pub d_model: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 128)]
    pub d_inner: usize,

    /// Attention heads; d_model must be divisible by this
    #[arg(long, default_value_t = 4)]
    pub n_head: usize,

    #[arg(long, default_value_t = 4)]
    pub n_layers: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Initial learning rate, halved every 10 epochs
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Label smoothing of the type loss
    #[arg(long, default_value_t = 0.1)]
    pub smooth: f64,

    /// Monte-Carlo draws per inter-event interval
    #[arg(long, default_value_t = 20)]
    pub stochastic_size: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Restrict the losses to endogenous events
    #[arg(long)]
    pub exogenous: bool,

    /// Skip the per-epoch validation on the dev split
    #[arg(long)]
    pub no_validation: bool,

    /// Write the test predictions to this JSON file
    #[arg(long)]
    pub predictions: Option<String>,

    /// Event types of the synthetic source (without --data)
    #[arg(long, default_value_t = 5)]
    pub synthetic_types: usize,

    /// Sequences per split of the synthetic source (without --data)
    #[arg(long, default_value_t = 200)]
    pub synthetic_sequences: usize,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data:            a.data,
            batch_size:      a.batch_size,
            epoch:           a.epoch,
            device:          a.device,
            log:             a.log,
            d_model:         a.d_model,
            d_inner:         a.d_inner,
            n_head:          a.n_head,
            n_layers:        a.n_layers,
            dropout:         a.dropout,
            lr:              a.lr,
            smooth:          a.smooth,
            stochastic_size: a.stochastic_size,
            seed:            a.seed,
            exogenous:       a.exogenous,
            validate:        !a.no_validation,
            predictions:     a.predictions,
            synthetic_types:     a.synthetic_types,
            synthetic_sequences: a.synthetic_sequences,
        }
    }
}

/// All arguments for the `stats` command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Archive path prefix; omit for the synthetic source
    #[arg(long)]
    pub data: Option<String>,

    /// Split to summarise
    #[arg(long, default_value = "train")]
    pub split: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 5)]
    pub synthetic_types: usize,

    #[arg(long, default_value_t = 200)]
    pub synthetic_sequences: usize,
}

impl StatsArgs {
    /// Reuses the train config's source selection.
    pub fn config(&self) -> TrainConfig {
        TrainConfig {
            data:                self.data.clone(),
            seed:                self.seed,
            synthetic_types:     self.synthetic_types,
            synthetic_sequences: self.synthetic_sequences,
            ..TrainConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["hawkes-train", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.stochastic_size, 20);
        assert_eq!(cfg.device, DeviceKind::Cpu);
        assert!(cfg.validate);
        assert!(cfg.data.is_none());
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "hawkes-train", "train",
            "--data", "data/so/",
            "--device", "gpu",
            "--exogenous",
            "--no-validation",
            "--epoch", "3",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.data.as_deref(), Some("data/so/"));
        assert_eq!(cfg.device, DeviceKind::Gpu);
        assert!(cfg.exogenous);
        assert!(!cfg.validate);
        assert_eq!(cfg.epoch, 3);
    }

    #[test]
    fn test_bad_device_is_rejected() {
        assert!(Cli::try_parse_from(["hawkes-train", "train", "--device", "tpu"]).is_err());
    }
}
