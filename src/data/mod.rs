// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a split on disk to padded tensor batches.
//
//   <prefix><split>.pkl         seeded Poisson generator
//         │                              │
//         ▼                              ▼
//   PickleLoader               SyntheticSource
//         └──────────────┬───────────────┘
//                        ▼
//   EventDataset      → implements Burn's Dataset trait
//                        │
//                        ▼
//   EventBatcher      → pads to the longest sequence
//                        │
//                        ▼
//   DataLoader        → feeds batches to the epoch drivers
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads pickled split archives
pub mod loader;

/// Multivariate Poisson sequence generator
pub mod synthetic;

/// Implements Burn's Dataset trait for event sequences
pub mod dataset;

/// Implements Burn's Batcher trait to create padded batches
pub mod batcher;
