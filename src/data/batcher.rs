// ============================================================
// Layer 4 — Event Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<EventSequence>
// into one padded tensor batch.
//
// Sequences have different lengths, so every field is padded
// to the longest sequence in the batch (L):
//
//   event_time  [B, L]  trailing 0.0
//   time_gap    [B, L]  trailing 0.0, first element 0
//   event_type  [B, L]  trailing PAD (0)
//   endo_mask   [B, L]  trailing false     (masked variant only)
//
// Tensors are created directly on the batcher's device, which
// is where the "transfer to compute device" step happens.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::{event::EventSequence, PAD};

// ─── EventBatch ───────────────────────────────────────────────────────────────
/// A padded batch. All tensors have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct EventBatch<B: Backend> {
    pub event_time: Tensor<B, 2>,
    pub time_gap:   Tensor<B, 2>,
    pub event_type: Tensor<B, 2, Int>,

    /// Present only when the batcher was built for the
    /// exogenous-aware variant. true = endogenous event.
    pub endo_mask: Option<Tensor<B, 2, Bool>>,
}

impl<B: Backend> EventBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.event_type.dims()[0]
    }

    pub fn seq_len(&self) -> usize {
        self.event_type.dims()[1]
    }
}

// ─── EventBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct EventBatcher<B: Backend> {
    device:        B::Device,
    with_endo_mask: bool,
}

impl<B: Backend> EventBatcher<B> {
    /// Batcher producing the 4-field batch (no mask)
    pub fn new(device: B::Device) -> Self {
        Self { device, with_endo_mask: false }
    }

    /// Batcher producing the 5-field batch (with endogenous mask)
    pub fn with_endo_mask(device: B::Device) -> Self {
        Self { device, with_endo_mask: true }
    }
}

impl<B: Backend> Batcher<EventSequence, EventBatch<B>> for EventBatcher<B> {
    fn batch(&self, items: Vec<EventSequence>) -> EventBatch<B> {
        let batch_size = items.len();
        // At least one column so an all-empty batch still has a shape
        let seq_len = items.iter().map(EventSequence::len).max().unwrap_or(0).max(1);

        let mut times = vec![0.0f32; batch_size * seq_len];
        let mut gaps  = vec![0.0f32; batch_size * seq_len];
        let mut types = vec![PAD as i32; batch_size * seq_len];
        let mut endo  = vec![0i32; batch_size * seq_len];

        for (row, seq) in items.iter().enumerate() {
            for (col, event) in seq.events.iter().enumerate() {
                let idx = row * seq_len + col;
                times[idx] = event.time as f32;
                gaps[idx]  = if col == 0 { 0.0 } else { event.time_since_last as f32 };
                types[idx] = event.kind as i32;
                endo[idx]  = event.endogenous as i32;
            }
        }

        let event_time = Tensor::<B, 1>::from_floats(times.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let time_gap = Tensor::<B, 1>::from_floats(gaps.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let event_type = Tensor::<B, 1, Int>::from_ints(types.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let endo_mask = self.with_endo_mask.then(|| {
            Tensor::<B, 1, Int>::from_ints(endo.as_slice(), &self.device)
                .reshape([batch_size, seq_len])
                .greater_elem(0)
        });

        EventBatch { event_time, time_gap, event_type, endo_mask }
    }
}
