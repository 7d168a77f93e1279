// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Wires the other layers together for one mode of the binary.
//
// Rules for this layer:
//   - No ML math or model code here
//   - Only workflow coordination and the run configuration
//
// Reference: Clean Architecture pattern

/// Run configuration shared by every layer
pub mod config;

/// The training workflow
pub mod train_use_case;

/// The interactive decoding workflow
pub mod chat_use_case;
