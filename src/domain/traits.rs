// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Data sources are programmed against a trait so the
// application layer never cares whether sequences came from
// pickled archives or the synthetic generator.

use anyhow::Result;

use crate::domain::event::EventSequence;

/// The sequences of one dataset split plus the declared
/// number of distinct event types.
#[derive(Debug, Clone)]
pub struct SplitData {
    pub sequences: Vec<EventSequence>,
    pub num_types: usize,
}

impl SplitData {
    pub fn num_events(&self) -> usize {
        self.sequences.iter().map(EventSequence::len).sum()
    }
}

// ─── SequenceSource ───────────────────────────────────────────────────────────
/// Any component that can produce the event sequences of a
/// named split ("train", "dev", "test").
///
/// Implementations:
///   - PickleLoader       → `<prefix><split>.pkl` archives
///   - SyntheticSource    → seeded Poisson sequences
pub trait SequenceSource {
    fn load_split(&self, split: &str) -> Result<SplitData>;
}
