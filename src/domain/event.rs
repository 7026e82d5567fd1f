// ============================================================
// Layer 3 — Event Domain Types
// ============================================================
// A marked temporal point process is a sequence of
// (time, type) pairs. These structs describe one observed
// event and one full sequence, independent of any tensor
// framework.
//
// Type convention:
//   Types are stored 1-indexed in [1, num_types].
//   0 is reserved as PAD so "no type" never collides with
//   "type 1". The classifier works 0-indexed, so targets are
//   shifted by -1 right before the loss.
//
// Reference: Zuo et al. (2020) Transformer Hawkes Process

use serde::{Deserialize, Serialize};

use crate::domain::PAD;
use crate::error::TrainError;

/// One observed event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Absolute time since the start of the sequence
    pub time: f64,

    /// Gap to the previous event (0 for the first event)
    pub time_since_last: f64,

    /// 1-indexed event type, never PAD
    pub kind: usize,

    /// true = generated by the process itself (counted in the loss),
    /// false = externally triggered (excluded by the masked variant)
    pub endogenous: bool,
}

impl Event {
    pub fn new(time: f64, time_since_last: f64, kind: usize) -> Self {
        Self { time, time_since_last, kind, endogenous: true }
    }

    pub fn exogenous(mut self) -> Self {
        self.endogenous = false;
        self
    }
}

/// An ordered sequence of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSequence {
    pub events: Vec<Event>,
}

impl EventSequence {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Builds a sequence from absolute times and 1-indexed types,
    /// deriving the gaps.
    pub fn from_times(times: &[f64], kinds: &[usize]) -> Self {
        let events = times
            .iter()
            .zip(kinds)
            .scan(None, |prev: &mut Option<f64>, (&t, &k)| {
                let gap = prev.map_or(0.0, |p| t - p);
                *prev = Some(t);
                Some(Event::new(t, gap, k))
            })
            .collect();
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events that have a predecessor, i.e. the
    /// number of next-event predictions this sequence yields.
    pub fn num_predictions(&self) -> usize {
        self.events.len().saturating_sub(1)
    }

    /// Checks the invariants the loss computation relies on:
    /// times are non-decreasing and every type is in [1, num_types].
    pub fn validate(&self, index: usize, num_types: usize) -> Result<(), TrainError> {
        let invalid = |reason: String| TrainError::InvalidSequence { index, reason };

        for (pos, event) in self.events.iter().enumerate() {
            if event.kind == PAD || event.kind > num_types {
                return Err(invalid(format!(
                    "event {pos} has type {} outside [1, {num_types}]",
                    event.kind
                )));
            }
            if !event.time.is_finite() || event.time < 0.0 {
                return Err(invalid(format!("event {pos} has time {}", event.time)));
            }
        }

        if let Some(pos) = self
            .events
            .windows(2)
            .position(|w| w[1].time < w[0].time)
        {
            return Err(invalid(format!("time decreases after event {pos}")));
        }
        Ok(())
    }
}
