// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the id files on disk and a padded batch:
//
//   id files (source, target)
//       │
//       ▼
//   CorpusLoader     → parse, trim, filter, assign to buckets
//       │
//       ▼
//   BucketedDataset  → examples per length bucket
//       │
//       ▼
//   sampler          → pick a bucket ∝ its size
//       │
//       ▼
//   BatchBuilder     → reverse/pad/mask into a Seq2SeqBatch
//
// Nothing in this layer depends on Burn; tensors are created in
// Layer 5 from the plain Vec rows built here.

/// Reads parallel id files into a BucketedDataset
pub mod loader;

/// Trimming policies applied before bucketing
pub mod trimmer;

/// Examples partitioned into length buckets
pub mod dataset;

/// Cumulative bucket distribution and sampling
pub mod sampler;

/// Builds padded, masked batches from one bucket
pub mod batcher;
