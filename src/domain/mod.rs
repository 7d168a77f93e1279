// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that describe the conversational
// model's data: buckets, examples, reserved token ids, the error
// taxonomy, and the collaborator seams the trainer talks to.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Buckets, examples and reserved vocabulary ids
pub mod example;

// The padded id batch every model step consumes
pub mod batch;

// Typed errors for data, sampling, config and training failures
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
