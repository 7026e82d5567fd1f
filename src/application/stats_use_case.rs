// ============================================================
// Layer 2 — StatsUseCase
// ============================================================
// Loads one split and summarises it, so an archive can be
// sanity-checked before committing to a training run.

use anyhow::Result;
use serde::Serialize;

use crate::domain::traits::{SequenceSource, SplitData};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitStats {
    pub num_sequences: usize,
    pub num_events:    usize,
    /// Events with a predecessor, i.e. prediction targets
    pub num_targets:   usize,
    pub num_exogenous: usize,
    pub num_types:     usize,
    pub min_len:       usize,
    pub max_len:       usize,
    pub mean_gap:      f64,
}

impl SplitStats {
    pub fn of(split: &SplitData) -> Self {
        let lengths = split.sequences.iter().map(|s| s.len());
        let gaps: Vec<f64> = split
            .sequences
            .iter()
            .flat_map(|s| s.events.iter().skip(1).map(|e| e.time_since_last))
            .collect();

        Self {
            num_sequences: split.sequences.len(),
            num_events:    split.num_events(),
            num_targets:   split.sequences.iter().map(|s| s.num_predictions()).sum(),
            num_exogenous: split
                .sequences
                .iter()
                .flat_map(|s| s.events.iter())
                .filter(|e| !e.endogenous)
                .count(),
            num_types:     split.num_types,
            min_len:       lengths.clone().min().unwrap_or(0),
            max_len:       lengths.max().unwrap_or(0),
            mean_gap:      if gaps.is_empty() { 0.0 } else { gaps.iter().sum::<f64>() / gaps.len() as f64 },
        }
    }
}

pub struct StatsUseCase {
    source: Box<dyn SequenceSource>,
}

impl StatsUseCase {
    pub fn new(source: Box<dyn SequenceSource>) -> Self {
        Self { source }
    }

    pub fn execute(&self, split: &str) -> Result<SplitStats> {
        let data  = self.source.load_split(split)?;
        let stats = SplitStats::of(&data);
        tracing::info!("{} split: {:?}", split, stats);
        Ok(stats)
    }
}
