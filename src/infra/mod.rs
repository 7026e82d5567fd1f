// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Output written alongside a run:
//
//   metrics.rs     — epoch metrics, best-so-far tracking and the
//                    append-only log file (one line per epoch)
//
//   predictions.rs — JSON dump of the tensors collected during
//                    the final test evaluation
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// Epoch metrics and the per-epoch log sink
pub mod metrics;

/// Collected evaluation tensors as JSON
pub mod predictions;
