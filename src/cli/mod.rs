// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates to Layer 2 (application).
//
//   1. `train` — trains and evaluates a Transformer Hawkes Process
//   2. `stats` — summarises one dataset split

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, StatsArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "hawkes-train",
    version = "0.1.0",
    about = "Train a Transformer Hawkes Process on marked event sequences."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Routes to the use case; never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Stats(args) => run_stats(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let log = args.log.clone();
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Per-epoch metrics in {}", log);
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    use crate::application::stats_use_case::StatsUseCase;

    let stats = StatsUseCase::new(args.config().source()).execute(&args.split)?;

    println!("split          : {}", args.split);
    println!("sequences      : {}", stats.num_sequences);
    println!("events         : {}", stats.num_events);
    println!("targets        : {}", stats.num_targets);
    println!("exogenous      : {}", stats.num_exogenous);
    println!("event types    : {}", stats.num_types);
    println!("length range   : {}..={}", stats.min_len, stats.max_len);
    println!("mean gap       : {:.5}", stats.mean_gap);
    Ok(())
}
