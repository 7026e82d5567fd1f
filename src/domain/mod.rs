// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing event sequences.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Reserved type index marking padding. Never a valid observed type.
pub const PAD: usize = 0;

// Events and event sequences
pub mod event;

// Source abstraction shared by the loaders
pub mod traits;
