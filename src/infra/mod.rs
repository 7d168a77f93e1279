// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files on disk that the other layers read or write:
//
//   checkpoint.rs   — model weights (CompactRecorder), the
//                     checkpoint.json pointer and the saved
//                     Seq2SeqConfig
//
//   embeddings.rs   — the pretrained word-vector matrix, read
//                     from a numpy .npz archive
//
//   vocab_store.rs  — vocabulary file → word-level tokenizer,
//                     used by the interactive decoder
//
//   metrics.rs      — optional per-checkpoint CSV telemetry

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Pretrained embedding archive reader
pub mod embeddings;

/// Vocabulary and tokenizer
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
