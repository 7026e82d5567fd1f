// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. Other layers hand over plain
// sequences and receive reduced metrics.
//
//   model.rs       — PointProcess contract and the Transformer
//                    Hawkes Process (embedding, temporal encoding,
//                    causal encoder, type/time/intensity heads)
//
//   likelihood.rs  — event log-likelihood with a Monte-Carlo
//                    non-event integral, type loss, time losses,
//                    each with an endogenous-masked variant
//
//   accumulator.rs — per-epoch running totals and their reduction
//
//   trainer.rs     — train / evaluate epoch drivers, the epoch
//                    orchestrator and the run entry point
//
//   scheduler.rs   — step learning-rate decay
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Zuo et al. (2020) Transformer Hawkes Process

/// Point-process contract and the transformer model
pub mod model;

/// Likelihood and prediction losses
pub mod likelihood;

/// Epoch totals folded over batches
pub mod accumulator;

/// Training and evaluation loops
pub mod trainer;

/// Learning-rate schedule
pub mod scheduler;

#[cfg(test)]
pub mod testing;
